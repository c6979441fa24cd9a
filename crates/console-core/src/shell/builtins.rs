//! Built-in commands.
//!
//! | command                         | effect                                              |
//! |---------------------------------|-----------------------------------------------------|
//! | `cmdlist [prefix]`              | table of visible command names (no variables)       |
//! | `echo <text...>`                | prints its arguments                                |
//! | `man <command>`                 | usage and help of a command                         |
//! | `alias <name> <line>`           | creates or replaces an alias                        |
//! | `unalias <name>`                | removes an alias and its bindings                   |
//! | `aliaslist [-s] [prefix]`       | aliases with their lines (`-s`: names only)         |
//! | `bind <key> [line] [release]`   | binds a shortcut, or lists bindings for `key`       |
//! | `unbind <key>`                  | removes a binding                                   |
//! | `unbindall`                     | removes every binding                               |
//! | `bindlist [prefix]`             | every binding as a `bind` line                      |
//! | `delay <seconds> <line...>`     | runs a line later through the timer engine          |
//! | `exec <path>`                   | runs each line of a file (`#` and `//` are comments)|
//! | `cvarlist [-s] [-a] [prefix]`   | variables and values (`-a`: include system ones)    |
//! | `toggle <name>`                 | flips a bool or int variable between 0 and 1        |
//! | `reset <name>`                  | restores a variable's default                       |
//! | `resetall [prefix]`             | restores every matching variable's default          |

use tracing::{error, info};

use crate::command::args::{ArgKind, ArgSpec, ArgValue, OptionSpec};
use crate::command::keys::{KeyCode, Trigger};
use crate::command::tokenizer::quote_arg;
use crate::command::{CVar, CommandDescriptor, CommandError, CommandKind, CommandRegistry};
use crate::shell::CommandContext;

/// Registers every built-in command into `registry`.
///
/// Names already taken are skipped with an error log, so a host may
/// pre-register its own `echo` and keep it.
pub fn register_builtins(registry: &mut CommandRegistry) {
    for descriptor in builtin_commands() {
        let name = descriptor.name.clone();
        if let Err(e) = registry.register(descriptor.builtin()) {
            error!("skipping built-in '{name}': {e}");
        }
    }
}

fn builtin_commands() -> Vec<CommandDescriptor> {
    vec![
        cmdlist(),
        echo(),
        man(),
        alias(),
        unalias(),
        aliaslist(),
        bind(),
        unbind(),
        unbindall(),
        bindlist(),
        delay(),
        exec(),
        cvarlist(),
        toggle(),
        reset(),
        resetall(),
    ]
}

fn optional_str(name: &str) -> ArgSpec {
    ArgSpec::optional(name, ArgKind::Str, ArgValue::Str(String::new()))
}

fn parse_shortcut(text: &str) -> Result<Trigger, CommandError> {
    text.parse::<Trigger>()
        .map_err(|_| CommandError::Failed(format!("Invalid shortcut: {text}")))
}

/// Completes key names for the last `+`-separated part of a shortcut.
fn complete_shortcut(_: &CommandRegistry, token: &str) -> Vec<String> {
    let (mods, key) = match token.rfind('+') {
        Some(i) => token.split_at(i + 1),
        None => ("", token),
    };
    KeyCode::names()
        .filter(|name| name.starts_with(key))
        .map(|name| format!("{mods}{name}"))
        .collect()
}

fn cmdlist() -> CommandDescriptor {
    CommandDescriptor::new("cmdlist", |ctx, args| {
        let prefix = args.str("prefix").unwrap_or("");
        let names = ctx.registry().command_names(prefix);
        if !names.is_empty() {
            ctx.print_table(names);
        }
        Ok(())
    })
    .help("Lists available commands.")
    .arg(optional_str("prefix"))
    .completer(|registry, token| registry.command_names(token))
}

fn echo() -> CommandDescriptor {
    CommandDescriptor::new("echo", |ctx, args| {
        ctx.print(args.rest().join(" "));
        Ok(())
    })
    .help("Prints its arguments.")
    .rest("text")
}

fn man() -> CommandDescriptor {
    CommandDescriptor::new("man", |ctx, args| {
        let name = args.str("command").unwrap_or("");
        let Some(command) = ctx.registry().find(name) else {
            return Err(CommandError::Failed(format!("command not found \"{name}\"")));
        };
        let usage = command.usage();
        let help = command.help.clone();
        ctx.print(usage);
        if !help.is_empty() {
            ctx.print(format!("  {help}"));
        }
        Ok(())
    })
    .help("Prints command usage.")
    .arg(ArgSpec::required("command", ArgKind::Str))
    .completer(|registry, token| {
        registry
            .list(token)
            .into_iter()
            .filter(|c| !c.is_alias())
            .map(|c| c.name.clone())
            .collect()
    })
}

fn alias() -> CommandDescriptor {
    CommandDescriptor::new("alias", |ctx, args| {
        let name = args.str("name").unwrap_or("");
        let line = args.str("line").unwrap_or("");
        ctx.registry_mut().register_alias(name, line)?;
        info!("alias {name} -> {line}");
        Ok(())
    })
    .help("Creates an alias name for command(s).")
    .ignore_options()
    .arg(ArgSpec::required("name", ArgKind::Str))
    .arg(ArgSpec::required("line", ArgKind::Str))
}

fn alias_names(registry: &CommandRegistry, token: &str) -> Vec<String> {
    registry
        .aliases(token)
        .into_iter()
        .map(|c| c.name.clone())
        .collect()
}

fn unalias() -> CommandDescriptor {
    CommandDescriptor::new("unalias", |ctx, args| {
        let name = args.str("name").unwrap_or("");
        if !ctx.registry_mut().remove_alias(name) {
            return Err(CommandError::Failed(format!("no alias named '{name}'")));
        }
        Ok(())
    })
    .help("Removes an alias.")
    .arg(ArgSpec::required("name", ArgKind::Str))
    .completer(alias_names)
}

fn aliaslist() -> CommandDescriptor {
    CommandDescriptor::new("aliaslist", |ctx, args| {
        let prefix = args.str("prefix").unwrap_or("");
        let aliases: Vec<(String, String)> = ctx
            .registry()
            .aliases(prefix)
            .into_iter()
            .map(|c| match &c.kind {
                CommandKind::Alias { line } => (c.name.clone(), line.clone()),
                _ => (c.name.clone(), String::new()),
            })
            .collect();

        if args.flag("short") {
            if !aliases.is_empty() {
                ctx.print_table(aliases.into_iter().map(|(name, _)| name).collect());
            }
        } else {
            for (name, line) in aliases {
                ctx.print(format!("  {name} {}", quote_arg(&line)));
            }
        }
        Ok(())
    })
    .help("Lists current aliases.")
    .option(OptionSpec::flag("short", Some('s')))
    .arg(optional_str("prefix"))
    .completer(alias_names)
}

fn bind() -> CommandDescriptor {
    CommandDescriptor::new("bind", |ctx, args| {
        let key = args.str("key").unwrap_or("").to_ascii_lowercase();
        let line = args.str("line").unwrap_or("");
        let release = args.str("release").unwrap_or("");

        if line.is_empty() {
            let listing: Vec<String> = ctx
                .registry()
                .bindings(&key)
                .into_iter()
                .map(|b| format!("  bind {} {}", b.trigger, quote_arg(&b.key_down)))
                .collect();
            if listing.is_empty() {
                ctx.print("  No bindings");
            }
            for entry in listing {
                ctx.print(entry);
            }
            return Ok(());
        }

        let trigger = parse_shortcut(&key)?;
        let release = (!release.is_empty()).then_some(release);
        ctx.registry_mut().bind(trigger, line, release)?;
        Ok(())
    })
    .help("Binds a shortcut to a command line.")
    .ignore_options()
    .arg(ArgSpec::required("key", ArgKind::Str))
    .arg(optional_str("line"))
    .arg(optional_str("release"))
    .completer(complete_shortcut)
}

fn unbind() -> CommandDescriptor {
    CommandDescriptor::new("unbind", |ctx, args| {
        let trigger = parse_shortcut(args.str("key").unwrap_or(""))?;
        ctx.registry_mut().unbind(&trigger);
        Ok(())
    })
    .help("Unbinds a shortcut.")
    .arg(ArgSpec::required("key", ArgKind::Str))
    .completer(|registry, token| {
        registry
            .bindings(token)
            .into_iter()
            .map(|b| b.trigger.to_string())
            .collect()
    })
}

fn unbindall() -> CommandDescriptor {
    CommandDescriptor::new("unbindall", |ctx, _| {
        ctx.registry_mut().unbind_all();
        Ok(())
    })
    .help("Unbinds all shortcuts.")
}

fn bindlist() -> CommandDescriptor {
    CommandDescriptor::new("bindlist", |ctx, args| {
        let prefix = args.str("prefix").unwrap_or("");
        let lines: Vec<String> = ctx
            .registry()
            .bindings(prefix)
            .into_iter()
            .map(|b| format!("  bind {} {}", b.trigger, quote_arg(&b.key_down)))
            .collect();
        for line in lines {
            ctx.print(line);
        }
        Ok(())
    })
    .help("Lists every bound shortcut and its command.")
    .arg(optional_str("prefix"))
}

fn delay() -> CommandDescriptor {
    CommandDescriptor::new("delay", |ctx, args| {
        let seconds = args.float("seconds").unwrap_or(0.0);
        let line = match args.rest() {
            [single] => single.clone(),
            tokens => tokens
                .iter()
                .map(|t| quote_arg(t))
                .collect::<Vec<_>>()
                .join(" "),
        };
        if line.trim().is_empty() {
            return Err(CommandError::Failed("nothing to run".into()));
        }
        ctx.defer(line, seconds)?;
        Ok(())
    })
    .help("Runs a command line after a delay in seconds.")
    .ignore_options()
    .arg(ArgSpec::required("seconds", ArgKind::Float))
    .rest("line")
}

fn exec() -> CommandDescriptor {
    CommandDescriptor::new("exec", |ctx, args| {
        let path = args.str("path").unwrap_or("");
        let script = std::fs::read_to_string(path)
            .map_err(|e| CommandError::Failed(format!("can't exec '{path}': {e}")))?;

        let mut failures = 0;
        for line in script.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }
            if ctx.execute_nested(line).is_err() {
                failures += 1;
            }
        }
        if failures > 0 {
            info!("exec {path}: {failures} line(s) failed");
        }
        Ok(())
    })
    .help("Executes the commands in a file.")
    .arg(ArgSpec::required("path", ArgKind::Str))
}

fn cvar_names(registry: &CommandRegistry, token: &str) -> Vec<String> {
    registry
        .cvars(token, false)
        .into_iter()
        .map(|c| c.name().to_string())
        .collect()
}

fn find_cvar(ctx: &CommandContext<'_>, name: &str) -> Result<CVar, CommandError> {
    ctx.registry()
        .find_cvar(name)
        .cloned()
        .ok_or_else(|| CommandError::Failed(format!("Can't find cvar '{name}'")))
}

fn cvarlist() -> CommandDescriptor {
    CommandDescriptor::new("cvarlist", |ctx, args| {
        let prefix = args.str("prefix").unwrap_or("");
        let vars: Vec<CVar> = ctx
            .registry()
            .cvars(prefix, args.flag("all"))
            .into_iter()
            .cloned()
            .collect();
        if vars.is_empty() {
            return Ok(());
        }

        if args.flag("short") {
            ctx.print_table(vars.iter().map(|c| c.name().to_string()).collect());
            return Ok(());
        }
        for cvar in vars {
            let mut line = format!("  {} {}", cvar.name(), quote_arg(&cvar.text()));
            if !cvar.is_default() {
                line.push_str(&format!(" default {}", quote_arg(&cvar.default_text())));
            }
            ctx.print(line);
        }
        Ok(())
    })
    .help("Lists console variables.")
    .option(OptionSpec::flag("short", Some('s')))
    .option(OptionSpec::flag("all", Some('a')))
    .arg(optional_str("prefix"))
    .completer(cvar_names)
}

fn toggle() -> CommandDescriptor {
    CommandDescriptor::new("toggle", |ctx, args| {
        let cvar = find_cvar(ctx, args.str("name").unwrap_or(""))?;
        cvar.toggle()?;
        Ok(())
    })
    .help("Toggles a bool or int variable between 0 and 1.")
    .arg(ArgSpec::required("name", ArgKind::Str))
    .completer(|registry, token| {
        registry
            .cvars(token, false)
            .into_iter()
            .filter(|c| c.kind() == ArgKind::Bool)
            .map(|c| c.name().to_string())
            .collect()
    })
}

fn reset() -> CommandDescriptor {
    CommandDescriptor::new("reset", |ctx, args| {
        let cvar = find_cvar(ctx, args.str("name").unwrap_or(""))?;
        cvar.reset();
        Ok(())
    })
    .help("Resets a variable to its default value.")
    .arg(ArgSpec::required("name", ArgKind::Str))
    .completer(cvar_names)
}

fn resetall() -> CommandDescriptor {
    CommandDescriptor::new("resetall", |ctx, args| {
        let prefix = args.str("prefix").unwrap_or("");
        let vars: Vec<CVar> = ctx
            .registry()
            .cvars(prefix, false)
            .into_iter()
            .cloned()
            .collect();
        for cvar in vars {
            cvar.reset();
        }
        Ok(())
    })
    .help("Resets all variables to their default values.")
    .arg(optional_str("prefix"))
    .completer(cvar_names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{CapturedOutput, OutputFrame};
    use crate::shell::Shell;
    use crate::timer::TimerEngine;

    struct Fixture {
        shell: Shell,
        timers: TimerEngine,
        out: CapturedOutput,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                shell: Shell::with_builtins(),
                timers: TimerEngine::new(),
                out: CapturedOutput::new(),
            }
        }

        fn run(&mut self, line: &str) -> bool {
            self.shell
                .execute(line, false, &mut self.timers, &mut self.out)
                .is_ok()
        }
    }

    #[test]
    fn test_echo_joins_arguments() {
        let mut f = Fixture::new();
        assert!(f.run("echo hello \"big world\""));
        assert_eq!(f.out.lines(), vec!["hello big world"]);
    }

    #[test]
    fn test_cmdlist_filters_by_prefix() {
        // Arrange
        let mut f = Fixture::new();

        // Act
        f.run("cmdlist unbind");

        // Assert
        assert_eq!(
            f.out.frames,
            vec![OutputFrame::Table(vec!["unbind".into(), "unbindall".into()])]
        );
    }

    #[test]
    fn test_man_prints_usage_and_help() {
        let mut f = Fixture::new();
        assert!(f.run("man delay"));
        assert_eq!(
            f.out.lines(),
            vec![
                "usage: delay <seconds> [line...]",
                "  Runs a command line after a delay in seconds."
            ]
        );
    }

    #[test]
    fn test_man_unknown_command_fails() {
        let mut f = Fixture::new();
        assert!(!f.run("man nothing"));
    }

    #[test]
    fn test_alias_runs_stored_line_and_unalias_removes_it() {
        // Arrange
        let mut f = Fixture::new();
        assert!(f.run("alias greet \"echo hi && echo there\""));

        // Act
        assert!(f.run("greet"));

        // Assert
        assert_eq!(f.out.lines(), vec!["hi", "there"]);
        assert!(f.run("unalias greet"));
        assert!(!f.run("greet"));
    }

    #[test]
    fn test_aliaslist_prints_name_and_line() {
        let mut f = Fixture::new();
        f.run("alias a1 \"echo one\"");
        f.run("alias a2 echo");
        f.out.clear();

        f.run("aliaslist");
        assert_eq!(f.out.lines(), vec!["  a1 \"echo one\"", "  a2 echo"]);

        f.out.clear();
        f.run("aliaslist -s");
        assert_eq!(
            f.out.frames,
            vec![OutputFrame::Table(vec!["a1".into(), "a2".into()])]
        );
    }

    #[test]
    fn test_bind_and_bindlist() {
        // Arrange
        let mut f = Fixture::new();

        // Act
        assert!(f.run("bind ctrl+shift+k \"echo pressed\""));
        assert!(f.run("bind f1 cmdlist"));
        f.out.clear();
        f.run("bindlist");

        // Assert
        assert_eq!(
            f.out.lines(),
            vec!["  bind ctrl+shift+k \"echo pressed\"", "  bind f1 cmdlist"]
        );
    }

    #[test]
    fn test_bind_rejects_invalid_shortcut_and_duplicates() {
        let mut f = Fixture::new();
        assert!(!f.run("bind ctrl+nothing echo"));
        match &f.out.frames[0] {
            OutputFrame::Exception {
                exception_message, ..
            } => assert_eq!(exception_message, "Invalid shortcut: ctrl+nothing"),
            other => panic!("unexpected frame {other:?}"),
        }

        assert!(f.run("bind f2 echo"));
        assert!(!f.run("bind f2 cmdlist"), "must unbind first");
    }

    #[test]
    fn test_unbind_and_unbindall() {
        let mut f = Fixture::new();
        f.run("bind f1 echo");
        f.run("bind f2 echo");
        assert!(f.run("unbind f1"));
        assert_eq!(f.shell.registry().bindings("").len(), 1);
        assert!(f.run("unbindall"));
        assert!(f.shell.registry().bindings("").is_empty());
    }

    #[test]
    fn test_delay_defers_line_through_timers() {
        // Arrange
        let mut f = Fixture::new();

        // Act
        assert!(f.run("delay 1.5 echo later"));
        f.timers.update(1.0);
        let early = f.shell.take_deferred();
        f.timers.update(0.5);
        let due = f.shell.take_deferred();

        // Assert
        assert!(early.is_empty());
        assert_eq!(due, vec!["echo later".to_string()]);
    }

    #[test]
    fn test_delay_rejects_negative_seconds() {
        let mut f = Fixture::new();
        assert!(!f.run("delay -1 echo x"));
        assert_eq!(f.timers.count(), 0);
    }

    #[test]
    fn test_exec_runs_script_lines_and_skips_comments() {
        // Arrange
        let path = std::env::temp_dir().join(format!("devconsole-exec-{}.cfg", std::process::id()));
        std::fs::write(&path, "# comment\necho one\n\n// other comment\necho two\n").unwrap();
        let mut f = Fixture::new();

        // Act
        let ok = f.run(&format!("exec {}", quote_arg(&path.to_string_lossy())));
        std::fs::remove_file(&path).ok();

        // Assert
        assert!(ok);
        assert_eq!(f.out.lines(), vec!["one", "two"]);
    }

    #[test]
    fn test_exec_missing_file_fails() {
        let mut f = Fixture::new();
        assert!(!f.run("exec /definitely/not/here.cfg"));
    }

    fn with_cvars(f: &mut Fixture) -> (CVar, CVar, CVar) {
        let god = CVar::new("god", false);
        let gravity = CVar::new("gravity", 9.8);
        let name = CVar::new("name", "player");
        for cvar in [&god, &gravity, &name] {
            f.shell.registry_mut().register_cvar(cvar.clone()).unwrap();
        }
        f.shell
            .registry_mut()
            .register_cvar(CVar::system("history_size", 512))
            .unwrap();
        (god, gravity, name)
    }

    #[test]
    fn test_cvar_command_prints_and_sets_value() {
        // Arrange
        let mut f = Fixture::new();
        let (_, gravity, name) = with_cvars(&mut f);

        // Act
        assert!(f.run("gravity"));
        assert!(f.run("gravity -1.5"));
        assert!(f.run("name '-dash name'"));

        // Assert
        assert_eq!(f.out.lines(), vec!["  gravity is:\"9.8\" default:\"9.8\""]);
        assert_eq!(gravity.float_value(), -1.5);
        assert_eq!(name.text(), "-dash name");
    }

    #[test]
    fn test_bool_cvar_rejects_other_values() {
        let mut f = Fixture::new();
        let (god, _, _) = with_cvars(&mut f);

        assert!(!f.run("god 2"));
        assert!(!f.run("god 1 1"));
        assert!(!god.bool_value());
        assert!(f.run("god 1"));
        assert!(god.bool_value());
    }

    #[test]
    fn test_cmdlist_skips_cvars() {
        let mut f = Fixture::new();
        with_cvars(&mut f);

        f.run("cmdlist g");

        assert!(f.out.frames.is_empty(), "{:?}", f.out.frames);
    }

    #[test]
    fn test_cvarlist_shows_values_and_changed_defaults() {
        // Arrange
        let mut f = Fixture::new();
        with_cvars(&mut f);
        f.run("gravity 1");

        // Act
        f.run("cvarlist");
        let long = f.out.lines().iter().map(|l| l.to_string()).collect::<Vec<_>>();
        f.out.clear();
        f.run("cvarlist -s -a");

        // Assert
        assert_eq!(
            long,
            vec!["  god 0", "  gravity 1 default 9.8", "  name player"]
        );
        assert_eq!(
            f.out.frames,
            vec![OutputFrame::Table(vec![
                "god".into(),
                "gravity".into(),
                "history_size".into(),
                "name".into()
            ])]
        );
    }

    #[test]
    fn test_toggle_reset_and_resetall() {
        // Arrange
        let mut f = Fixture::new();
        let (god, gravity, name) = with_cvars(&mut f);

        // Act / Assert
        assert!(f.run("toggle god"));
        assert!(god.bool_value());
        assert!(f.run("reset god"));
        assert!(god.is_default());

        assert!(!f.run("toggle gravity"), "floats can't be toggled");
        assert!(!f.run("reset nothing"));

        f.run("gravity 0 && name other && toggle god");
        assert!(f.run("resetall g"));
        assert!(god.is_default() && gravity.is_default());
        assert!(!name.is_default());
        assert!(f.run("resetall"));
        assert!(name.is_default());
    }

    #[test]
    fn test_toggle_completes_bool_cvars_only() {
        // Arrange
        let mut f = Fixture::new();
        with_cvars(&mut f);

        // Act
        let toggle = f.shell.complete("toggle g", 8, false, &mut f.out);
        let reset = f.shell.complete("reset g", 7, true, &mut f.out);

        // Assert
        assert_eq!(toggle.as_deref(), Some("toggle god "));
        assert_eq!(reset, None, "no longer common prefix than 'g'");
        assert_eq!(
            f.out.frames,
            vec![OutputFrame::Table(vec!["god".into(), "gravity".into()])]
        );
    }

    #[test]
    fn test_complete_shortcut_keeps_modifiers() {
        let registry = CommandRegistry::new();
        let candidates = complete_shortcut(&registry, "ctrl+pa");
        assert_eq!(candidates, vec!["ctrl+pause", "ctrl+pageup", "ctrl+pagedown"]);
    }
}
