use std::time::Duration;

use arbor::{
    AppContext, Application,
    error::Result,
    geom::Rect,
    view::{DrawContext, ViewId, Views},
    widget::Widget,
};

/// A counter advanced by a timer.
#[derive(Debug, Clone, Default)]
pub struct Counter {
    /// Timer period in milliseconds, shown beside the count.
    pub period: u64,
    /// Ticks so far.
    pub value: u64,
}

impl Widget for Counter {
    fn draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<()> {
        ctx.clear();
        ctx.print(0, 0, &format!("{:>5}ms {}", self.period, self.value));
        Ok(())
    }
}

/// Advance the counter at `id` and damage it. False once the view is gone.
fn tick(ctx: &mut AppContext, id: ViewId) -> bool {
    let Ok(c) = ctx.views_mut().widget_mut::<Counter>(id) else {
        return false;
    };
    c.value += 1;
    ctx.views_mut().set_needs_display(id).is_ok()
}

/// Build a toplevel with one counter per period, one per row.
pub fn build(views: &mut Views, periods: &[u64]) -> Result<(ViewId, Vec<ViewId>)> {
    let top = views.create_toplevel("intervals");
    let mut counters = Vec::new();
    for (row, &period) in periods.iter().enumerate() {
        let c = views.create_with("counter", Counter { period, value: 0 });
        views.add(top, c)?;
        views.set_frame(c, Rect::new(0, row as i32, 30, 1))?;
        counters.push(c);
    }
    Ok((top, counters))
}

/// Start a repeating timer for every counter.
pub fn start(app: &Application, views: &Views, counters: &[ViewId]) -> Result<()> {
    for &id in counters {
        let period = views.widget::<Counter>(id)?.period;
        app.main_loop()
            .add_timeout(Duration::from_millis(period), move |ctx| tick(ctx, id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Instant};

    use arbor::testing::Harness;

    use super::*;

    #[test]
    fn counters_tick() -> Result<()> {
        let mut h = Harness::new(30, 3);
        let (top, counters) = build(h.views_mut(), &[1, 3_600_000])?;
        start(&h.app, h.app.views(), &counters)?;
        h.begin(top)?;
        let deadline = Instant::now() + Duration::from_secs(5);
        while h.views().widget::<Counter>(counters[0])?.value < 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
            h.pump()?;
        }
        assert!(h.views().widget::<Counter>(counters[0])?.value >= 2);
        assert_eq!(h.views().widget::<Counter>(counters[1])?.value, 0);
        assert!(h.row(1).starts_with("3600000ms 0"));
        Ok(())
    }
}
