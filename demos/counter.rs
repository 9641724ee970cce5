//! A counter driven by simulated clicks on a calloop event loop.
//!
//! Run with `RUST_LOG=debug cargo run --example counter` to watch requests
//! coalesce into batches.

use std::rc::Rc;
use std::time::Duration;

use calloop::timer::{TimeoutAction, Timer};
use calloop::{EventLoop, LoopSignal};
use vdom_helpers::prelude::*;

const CLICKS: u32 = 6;

struct LogRenderer;

impl Renderer for LogRenderer {
    fn render_into(&self, dom: DomHandle, tree: &Vnode) {
        log::info!("render into {:?}: {:?}", dom, tree);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut event_loop: EventLoop<'static, LoopSignal> = EventLoop::try_new()?;
    let mut signal = event_loop.get_signal();

    let frames = Rc::new(CalloopFrames::new(event_loop.handle()));
    let scheduler = Scheduler::new(frames, Rc::new(LogRenderer));

    let count = create_store(0u32);
    count.observe(|next, prev| log::debug!("count {} -> {}", prev, next));

    let history = create_store(Vec::<u32>::new());
    let view_count = count.clone();
    let view_history = history.clone();
    let counter = scheduler.mount(
        DomHandle::new(1),
        Component::new(move || {
            let list = each(
                view_history.get(),
                |n, _| *n,
                |n, _| h("li").child(text(format!("click {}", n))),
            )?;
            Ok(fragment([
                Vnode::from(h("p").child(text(format!("count: {}", view_count.get())))),
                when(view_count.get() >= CLICKS, || text("done"), || ()),
                Vnode::from(h("ul").child(list)),
            ]))
        })
        .tag("section"),
    );

    let on_click = counter.link(move |_: &mut Event| {
        count.update(|n| *n += 1);
        history.update(|list| list.push(list.len() as u32 + 1));
    });

    counter.redraw_sync()?;

    let mut clicks = 0;
    event_loop
        .handle()
        .insert_source(
            Timer::from_duration(Duration::from_millis(5)),
            move |_, _, signal: &mut LoopSignal| {
                // Two events per tick, one batch per frame
                on_click.call(&mut Event::new("click"));
                on_click.call(&mut Event::new("click"));
                clicks += 2;
                if clicks >= CLICKS {
                    signal.stop();
                    TimeoutAction::Drop
                } else {
                    TimeoutAction::ToDuration(Duration::from_millis(20))
                }
            },
        )
        .map_err(|err| err.error)?;

    event_loop.run(None, &mut signal, |_| {})?;

    counter.redraw_sync()?;
    counter.unmount();
    Ok(())
}
