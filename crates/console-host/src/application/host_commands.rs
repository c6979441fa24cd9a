//! Commands the demo host adds on top of the shell built-ins.

use std::cell::Cell;
use std::rc::Rc;

use console_core::command::{ArgKind, ArgSpec, CommandDescriptor, CommandError, Trigger};

/// Shared flag set by `quit`; the host loop polls it once per tick.
#[derive(Debug, Clone, Default)]
pub struct QuitFlag(Rc<Cell<bool>>);

impl QuitFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.set(true);
    }

    pub fn is_requested(&self) -> bool {
        self.0.get()
    }
}

pub fn host_commands(quit: &QuitFlag) -> Vec<CommandDescriptor> {
    let quit = quit.clone();
    vec![
        CommandDescriptor::new("quit", move |ctx, _| {
            ctx.print("shutting down");
            quit.request();
            Ok(())
        })
        .help("Stops the host after the current tick."),
        CommandDescriptor::new("uptime", |ctx, _| {
            let secs = ctx.timers.current_time();
            let whole = secs as u64;
            ctx.print(format!(
                "{:02}:{:02}:{:02} ({secs:.3}s of timer time)",
                whole / 3600,
                whole / 60 % 60,
                whole % 60
            ));
            Ok(())
        })
        .help("Prints how long the timer engine has been running."),
        CommandDescriptor::new("timers", |ctx, _| {
            let scheduled = ctx.timers.count();
            let slots = ctx.timers.allocated_slots();
            ctx.print(format!("{scheduled} timer(s) scheduled, {slots} slot(s) allocated"));
            Ok(())
        })
        .help("Prints timer engine statistics."),
        CommandDescriptor::new("press", |ctx, args| {
            let shortcut = args.str("shortcut").unwrap_or("");
            let trigger: Trigger = shortcut
                .parse()
                .map_err(|e| CommandError::Failed(format!("{e}")))?;
            let down = ctx.shell.handle_key(trigger, true, ctx.timers, ctx.out);
            let Some(down) = down else {
                return Err(CommandError::Failed(format!("{trigger} is not bound")));
            };
            down?;
            if let Some(up) = ctx.shell.handle_key(trigger, false, ctx.timers, ctx.out) {
                up?;
            }
            Ok(())
        })
        .help("Simulates pressing and releasing a bound shortcut.")
        .arg(ArgSpec::required("shortcut", ArgKind::Str)),
    ]
}
