//! Integration tests for key and mouse routing.

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use arbor::{
        app::EventContext,
        error::Result,
        event::{
            Event, KeyCode,
            key::{self, Key},
            mouse::{Action, Button, MouseEvent},
        },
        geom::{Point, Rect},
        testing::{
            Harness,
            widgets::{Log, Recorder, Seen, take},
        },
        view::{DrawContext, ViewId},
        widget::{EventOutcome, Widget},
    };

    /// A toplevel with two focusable recorders stacked on rows 0 and 1.
    fn two_rows(h: &mut Harness, a: Recorder, b: Recorder) -> Result<(ViewId, ViewId, ViewId)> {
        let v = h.views_mut();
        let top = v.create_toplevel("top");
        let a = v.create_with("a", a);
        let b = v.create_with("b", b);
        v.add(top, a)?;
        v.add(top, b)?;
        v.set_frame(a, Rect::new(0, 0, 4, 1))?;
        v.set_frame(b, Rect::new(0, 1, 4, 1))?;
        v.set_can_focus(a, true)?;
        v.set_can_focus(b, true)?;
        h.begin(top)?;
        Ok((top, a, b))
    }

    #[test]
    fn hot_then_focus_chain_then_cold() -> Result<()> {
        let log = Log::default();
        let mut h = Harness::new(10, 4);
        let (top, a, _) = two_rows(&mut h, Recorder::new("a", &log), Recorder::new("b", &log))?;
        assert_eq!(h.views().get(top)?.focused(), Some(a));
        take(&log);

        let x = Key::from('x');
        h.key(x)?;
        assert_eq!(
            take(&log),
            vec![
                Seen::Hot("a", x),
                Seen::Hot("b", x),
                Seen::Key("a", x),
                Seen::Cold("a", x),
                Seen::Cold("b", x),
            ]
        );
        Ok(())
    }

    #[test]
    fn hot_key_claim_stops_dispatch() -> Result<()> {
        let log = Log::default();
        let mut h = Harness::new(10, 4);
        two_rows(
            &mut h,
            Recorder::new("a", &log),
            Recorder::new("b", &log).hot('h'),
        )?;
        take(&log);
        h.key('h')?;
        let h_key = Key::from('h');
        assert_eq!(take(&log), vec![Seen::Hot("a", h_key), Seen::Hot("b", h_key)]);
        Ok(())
    }

    #[test]
    fn cold_keys_reach_unfocused_views() -> Result<()> {
        let log = Log::default();
        let mut h = Harness::new(10, 4);
        two_rows(
            &mut h,
            Recorder::new("a", &log),
            Recorder::new("b", &log).cold('c'),
        )?;
        take(&log);
        h.key('c')?;
        let seen = take(&log);
        assert_eq!(seen.last(), Some(&Seen::Cold("b", Key::from('c'))));
        assert!(!seen.contains(&Seen::Key("b", Key::from('c'))));
        Ok(())
    }

    #[test]
    fn tab_wraps() -> Result<()> {
        let log = Log::default();
        let mut h = Harness::new(10, 4);
        let (top, a, b) = two_rows(&mut h, Recorder::new("a", &log), Recorder::new("b", &log))?;
        h.key(KeyCode::Tab)?;
        assert_eq!(h.views().get(top)?.focused(), Some(b));
        h.key(KeyCode::Tab)?;
        assert_eq!(h.views().get(top)?.focused(), Some(a));
        h.key(KeyCode::BackTab)?;
        assert_eq!(h.views().get(top)?.focused(), Some(b));
        assert!(h.views().get(b)?.has_focus());
        assert!(!h.views().get(a)?.has_focus());
        Ok(())
    }

    #[test]
    fn focused_view_claims_tab() -> Result<()> {
        let log = Log::default();
        let mut h = Harness::new(10, 4);
        let (top, a, _) = two_rows(
            &mut h,
            Recorder::new("a", &log).key(KeyCode::Tab),
            Recorder::new("b", &log),
        )?;
        h.key(KeyCode::Tab)?;
        assert_eq!(h.views().get(top)?.focused(), Some(a));
        Ok(())
    }

    #[test]
    fn quit_key_stops() -> Result<()> {
        let log = Log::default();
        let mut h = Harness::new(10, 4);
        two_rows(&mut h, Recorder::new("a", &log), Recorder::new("b", &log))?;
        assert!(h.is_running());
        h.key(key::Ctrl + 'q')?;
        assert!(!h.is_running());
        Ok(())
    }

    #[test]
    fn paste_arrives_as_keys() -> Result<()> {
        let log = Log::default();
        let mut h = Harness::new(10, 4);
        two_rows(&mut h, Recorder::new("a", &log).key('o').key('k'), Recorder::new("b", &log))?;
        take(&log);
        h.event(Event::Paste("ok".into()))?;
        let keys: Vec<_> = take(&log)
            .into_iter()
            .filter_map(|s| match s {
                Seen::Key(_, k) => Some(k),
                _ => None,
            })
            .collect();
        assert_eq!(keys, vec![Key::from('o'), Key::from('k')]);
        Ok(())
    }

    #[test]
    fn click_focuses_and_bubbles() -> Result<()> {
        let log = Log::default();
        let mut h = Harness::new(10, 6);
        let v = h.views_mut();
        let top = v.create_toplevel("top");
        let panel = v.create_with("panel", Recorder::new("panel", &log).mouse());
        let leaf = v.create_with("leaf", Recorder::new("leaf", &log));
        let other = v.create_with("other", Recorder::new("other", &log));
        v.add(top, other)?;
        v.add(top, panel)?;
        v.add(panel, leaf)?;
        v.set_frame(other, Rect::new(0, 0, 10, 1))?;
        v.set_frame(panel, Rect::new(2, 2, 6, 3))?;
        v.set_frame(leaf, Rect::new(1, 1, 2, 1))?;
        v.set_can_focus(other, true)?;
        v.set_can_focus(leaf, true)?;
        h.begin(top)?;
        assert_eq!(h.views().get(top)?.focused(), Some(other));
        take(&log);

        h.click(4, 3)?;
        let down = MouseEvent::click(0, 0);
        assert_eq!(
            take(&log),
            vec![
                Seen::Mouse("leaf", down.with_location(Point::new(1, 0))),
                Seen::Mouse("panel", down.with_location(Point::new(2, 1))),
            ]
        );
        assert_eq!(h.views().most_focused(top), leaf);
        Ok(())
    }

    #[test]
    fn clicks_outside_every_view_are_dropped() -> Result<()> {
        let log = Log::default();
        let mut h = Harness::new(10, 4);
        two_rows(&mut h, Recorder::new("a", &log), Recorder::new("b", &log))?;
        take(&log);
        h.click(20, 20)?;
        assert!(take(&log).is_empty());
        Ok(())
    }

    /// Grabs the mouse on press and releases it on release, logging every
    /// location it receives.
    struct Grabber(Rc<RefCell<Vec<(Action, Point)>>>);

    impl Widget for Grabber {
        fn draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<()> {
            ctx.clear();
            Ok(())
        }

        fn on_mouse(&mut self, event: MouseEvent, ctx: &mut EventContext<'_>) -> Result<EventOutcome> {
            self.0.borrow_mut().push((event.action, event.location));
            match event.action {
                Action::Down => ctx.grab_mouse(),
                Action::Up => ctx.ungrab_mouse(),
                _ => {}
            }
            Ok(EventOutcome::Consume)
        }
    }

    #[test]
    fn grab_routes_everything() -> Result<()> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Log::default();
        let mut h = Harness::new(12, 4);
        let v = h.views_mut();
        let top = v.create_toplevel("top");
        let g = v.create_with("grabber", Grabber(seen.clone()));
        let r = v.create_with("r", Recorder::new("r", &log).mouse());
        v.add(top, g)?;
        v.add(top, r)?;
        v.set_frame(g, Rect::new(0, 0, 4, 2))?;
        v.set_frame(r, Rect::new(6, 0, 4, 2))?;
        h.begin(top)?;

        let at = |action, x, y| MouseEvent {
            action,
            button: Button::Left,
            modifiers: key::Empty,
            location: Point::new(x, y),
        };
        h.mouse(at(Action::Down, 1, 1))?;
        h.mouse(at(Action::Drag, 8, 1))?;
        h.mouse(at(Action::Up, 9, 0))?;
        h.click(7, 0)?;
        assert_eq!(
            *seen.borrow(),
            vec![
                (Action::Down, Point::new(1, 1)),
                (Action::Drag, Point::new(8, 1)),
                (Action::Up, Point::new(9, 0)),
            ]
        );
        assert_eq!(take(&log), vec![Seen::Mouse("r", MouseEvent::click(1, 0))]);
        assert_eq!(h.ctx().grabbed(), None);
        Ok(())
    }
}
