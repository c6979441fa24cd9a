//! Command registry.
//!
//! The registry owns every [`CommandDescriptor`] and the [`BindingTable`].
//! Bindings refer to commands by name, so unregistering a command also drops
//! every binding whose key-down or key-up line invokes it.
//!
//! Descriptors are kept in a `BTreeMap`, which makes listing and completion
//! come out sorted by name without an extra pass.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use super::args::{
    arg_usage, parse_args, parse_positional, ArgKind, ArgParseError, ArgSpec, OptionSpec,
    ParsedArgs,
};
use super::bindings::{opposite_line, Binding, BindingTable};
use super::cvar::CVar;
use super::keys::Trigger;
use super::tokenizer::{parse_command, quote_arg, split_commands};
use super::{CommandError, RegistryError};
use crate::shell::CommandContext;

/// Function invoked to run a command.
pub type CommandHandler = Rc<dyn Fn(&mut CommandContext<'_>, &ParsedArgs) -> Result<(), CommandError>>;

/// Function producing completion candidates for a command's arguments.
///
/// Receives the registry and the partial token under the cursor and returns
/// every candidate starting with that token.
pub type CommandCompleter = Rc<dyn Fn(&CommandRegistry, &str) -> Vec<String>>;

/// Where a command came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// Shipped with the shell (`cmdlist`, `bind`, ...).
    Builtin,
    /// Registered by the host application.
    User,
    /// Created with `alias`; runs the stored line.
    Alias { line: String },
    /// Prints or sets a console variable.
    CVar(CVar),
}

/// A registered command.
#[derive(Clone)]
pub struct CommandDescriptor {
    pub name: String,
    pub help: String,
    pub args: Vec<ArgSpec>,
    pub options: Vec<OptionSpec>,
    /// Name of the variadic parameter collecting surplus tokens, if any.
    pub rest: Option<String>,
    /// Hidden commands run normally but are skipped by listing and completion.
    pub hidden: bool,
    /// Treat `-x` / `--x` tokens as plain arguments.  `options` is ignored.
    pub ignore_options: bool,
    pub kind: CommandKind,
    handler: CommandHandler,
    completer: Option<CommandCompleter>,
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("args", &self.args)
            .field("options", &self.options)
            .field("rest", &self.rest)
            .field("hidden", &self.hidden)
            .field("ignore_options", &self.ignore_options)
            .finish_non_exhaustive()
    }
}

impl CommandDescriptor {
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut CommandContext<'_>, &ParsedArgs) -> Result<(), CommandError> + 'static,
    {
        Self {
            name: name.into(),
            help: String::new(),
            args: Vec::new(),
            options: Vec::new(),
            rest: None,
            hidden: false,
            ignore_options: false,
            kind: CommandKind::User,
            handler: Rc::new(handler),
            completer: None,
        }
    }

    /// A command that executes `line` whenever it runs.
    pub fn alias(name: impl Into<String>, line: impl Into<String>) -> Self {
        let line = line.into();
        let stored = line.clone();
        let mut descriptor = Self::new(name, move |ctx, _| {
            ctx.execute_nested(&stored)?;
            Ok(())
        });
        descriptor.help = format!("alias for '{line}'");
        descriptor.kind = CommandKind::Alias { line };
        descriptor
    }

    /// The command that prints (no argument) or sets (one argument) `cvar`.
    pub fn cvar(cvar: CVar) -> Self {
        let target = cvar.clone();
        let mut descriptor = Self::new(cvar.name(), move |ctx, args| match args.rest() {
            [] => {
                ctx.print(format!(
                    "  {} is:\"{}\" default:\"{}\"",
                    target.name(),
                    target.text(),
                    target.default_text()
                ));
                Ok(())
            }
            [value] => {
                target.set_from_str(value)?;
                Ok(())
            }
            _ => Err(CommandError::Failed("Unexpected args count".into())),
        });
        descriptor.help = format!(
            "{} variable, default {}",
            cvar.kind().label(),
            quote_arg(&cvar.default_text())
        );
        descriptor.rest = Some("value".into());
        descriptor.ignore_options = true;
        if cvar.kind() == ArgKind::Bool {
            descriptor = descriptor.completer(|_, token| {
                ["0", "1"]
                    .into_iter()
                    .filter(|v| v.starts_with(token))
                    .map(str::to_string)
                    .collect()
            });
        }
        descriptor.kind = CommandKind::CVar(cvar);
        descriptor
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn arg(mut self, spec: ArgSpec) -> Self {
        self.args.push(spec);
        self
    }

    pub fn option(mut self, spec: OptionSpec) -> Self {
        self.options.push(spec);
        self
    }

    pub fn rest(mut self, name: impl Into<String>) -> Self {
        self.rest = Some(name.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn ignore_options(mut self) -> Self {
        self.ignore_options = true;
        self
    }

    pub fn builtin(mut self) -> Self {
        self.kind = CommandKind::Builtin;
        self
    }

    pub fn completer<F>(mut self, completer: F) -> Self
    where
        F: Fn(&CommandRegistry, &str) -> Vec<String> + 'static,
    {
        self.completer = Some(Rc::new(completer));
        self
    }

    pub fn handler(&self) -> CommandHandler {
        Rc::clone(&self.handler)
    }

    pub fn arg_completer(&self) -> Option<CommandCompleter> {
        self.completer.clone()
    }

    pub fn is_alias(&self) -> bool {
        matches!(self.kind, CommandKind::Alias { .. })
    }

    pub fn as_cvar(&self) -> Option<&CVar> {
        match &self.kind {
            CommandKind::CVar(cvar) => Some(cvar),
            _ => None,
        }
    }

    /// Parses argument tokens against this command's parameters.
    pub fn parse(&self, tokens: &[String]) -> Result<ParsedArgs, ArgParseError> {
        if self.ignore_options {
            return parse_positional(&self.args, self.rest.as_deref(), tokens);
        }
        parse_args(&self.args, &self.options, self.rest.as_deref(), tokens)
    }

    /// One-line usage, e.g. `usage: bind [-f|--force] <key> <command>`.
    pub fn usage(&self) -> String {
        let mut usage = format!("usage: {}", self.name);
        let options = if self.ignore_options { &[][..] } else { &self.options[..] };
        for option in options {
            usage.push(' ');
            usage.push_str(&option.usage());
        }
        for arg in &self.args {
            usage.push(' ');
            usage.push_str(&arg_usage(arg));
        }
        if let Some(rest) = &self.rest {
            usage.push_str(&format!(" [{rest}...]"));
        }
        usage
    }
}

/// Name → command map plus the key binding table.
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, CommandDescriptor>,
    bindings: BindingTable,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `descriptor`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateName`] if the name is taken.
    pub fn register(&mut self, descriptor: CommandDescriptor) -> Result<(), RegistryError> {
        if self.commands.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateName(descriptor.name));
        }
        debug!("registered command '{}'", descriptor.name);
        self.commands.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Creates or replaces the alias `name`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateName`] if `name` is a non-alias command.
    pub fn register_alias(&mut self, name: &str, line: &str) -> Result<(), RegistryError> {
        match self.commands.get(name) {
            Some(existing) if !existing.is_alias() => {
                Err(RegistryError::DuplicateName(name.to_string()))
            }
            _ => {
                self.commands
                    .insert(name.to_string(), CommandDescriptor::alias(name, line));
                Ok(())
            }
        }
    }

    /// Registers `cvar` as a command of the same name.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateName`] if the name is taken.
    pub fn register_cvar(&mut self, cvar: CVar) -> Result<(), RegistryError> {
        self.register(CommandDescriptor::cvar(cvar))
    }

    pub fn find_cvar(&self, name: &str) -> Option<&CVar> {
        self.commands.get(name)?.as_cvar()
    }

    /// Visible variables whose name starts with `prefix`, sorted by name.
    /// System variables are included only when `include_system` is set.
    pub fn cvars(&self, prefix: &str, include_system: bool) -> Vec<&CVar> {
        self.list(prefix)
            .into_iter()
            .filter_map(CommandDescriptor::as_cvar)
            .filter(|cvar| include_system || !cvar.is_system())
            .collect()
    }

    /// Removes a command and every binding that invokes it.
    ///
    /// No-op (returns `None`) when the name is not registered.
    pub fn unregister(&mut self, name: &str) -> Option<CommandDescriptor> {
        let removed = self.commands.remove(name)?;
        let unbound = self.bindings.unbind_command(name);
        debug!("unregistered command '{name}' ({unbound} binding(s) dropped)");
        Some(removed)
    }

    /// Removes the alias `name`; returns `false` if it is not an alias.
    pub fn remove_alias(&mut self, name: &str) -> bool {
        match self.commands.get(name) {
            Some(descriptor) if descriptor.is_alias() => self.unregister(name).is_some(),
            _ => false,
        }
    }

    pub fn find(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Visible commands whose name starts with `prefix`, sorted by name.
    pub fn list(&self, prefix: &str) -> Vec<&CommandDescriptor> {
        self.commands
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(_, d)| d)
            .filter(|d| !d.hidden)
            .collect()
    }

    /// Aliases whose name starts with `prefix`, sorted by name.
    pub fn aliases(&self, prefix: &str) -> Vec<&CommandDescriptor> {
        self.list(prefix).into_iter().filter(|d| d.is_alias()).collect()
    }

    /// Names of visible commands and variables starting with `prefix`.
    pub fn names(&self, prefix: &str) -> Vec<String> {
        self.list(prefix).into_iter().map(|d| d.name.clone()).collect()
    }

    /// Like [`names`](Self::names) without console variables.
    pub fn command_names(&self, prefix: &str) -> Vec<String> {
        self.list(prefix)
            .into_iter()
            .filter(|d| d.as_cvar().is_none())
            .map(|d| d.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    // ── Bindings ──────────────────────────────────────────────────────────────

    /// Binds `trigger` to a command line.
    ///
    /// Without an explicit `key_up`, a `+command` line is released with
    /// `-command` when such a command is registered, and has no key-up line
    /// otherwise.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownCommand`] if any command a line chains is not
    /// registered, [`RegistryError::InvalidLine`] if a line is blank or does
    /// not tokenize, [`RegistryError::DuplicateBinding`] if the trigger is
    /// taken.
    pub fn bind(
        &mut self,
        trigger: Trigger,
        key_down: &str,
        key_up: Option<&str>,
    ) -> Result<(), RegistryError> {
        self.validate_line(key_down)?;
        let key_up = match key_up {
            Some(line) => {
                self.validate_line(line)?;
                Some(line.to_string())
            }
            None => opposite_line(key_down).filter(|line| self.validate_line(line).is_ok()),
        };
        self.bindings.bind(trigger, key_down, key_up)
    }

    /// Resolves `line` the way the shell will: every `&&` segment must
    /// tokenize and name a registered command.
    fn validate_line(&self, line: &str) -> Result<(), RegistryError> {
        let invalid = |reason: String| RegistryError::InvalidLine {
            line: line.to_string(),
            reason,
        };
        let segments = split_commands(line);
        if segments.is_empty() {
            return Err(invalid("empty command".into()));
        }
        for segment in &segments {
            let (name, _) = parse_command(segment).map_err(|e| invalid(e.to_string()))?;
            if !self.contains(&name) {
                return Err(RegistryError::UnknownCommand(name));
            }
        }
        Ok(())
    }

    /// [`bind`](Self::bind) with a textual shortcut such as `ctrl+shift+k`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::InvalidTrigger`] if the shortcut does not parse, plus
    /// the errors of [`bind`](Self::bind).
    pub fn bind_shortcut(
        &mut self,
        shortcut: &str,
        key_down: &str,
        key_up: Option<&str>,
    ) -> Result<Trigger, RegistryError> {
        let trigger: Trigger = shortcut.parse()?;
        self.bind(trigger, key_down, key_up)?;
        Ok(trigger)
    }

    pub fn find_binding(&self, trigger: &Trigger) -> Option<&Binding> {
        self.bindings.find(trigger)
    }

    pub fn unbind(&mut self, trigger: &Trigger) -> bool {
        self.bindings.unbind(trigger)
    }

    pub fn unbind_all(&mut self) {
        self.bindings.unbind_all();
    }

    /// Bindings whose trigger name starts with `prefix`.
    pub fn bindings(&self, prefix: &str) -> Vec<&Binding> {
        self.bindings.list(prefix)
    }
}
