//! Console variables.
//!
//! A [`CVar`] is a named, typed value with a default.  Registering it with
//! [`CommandRegistry::register_cvar`](super::CommandRegistry::register_cvar)
//! creates a command of the same name:
//!
//! ```text
//! > volume            prints   volume is:"0.8" default:"1"
//! > volume 0.5        sets the value
//! > reset volume      back to the default
//! ```
//!
//! The host keeps its own clone of the handle and reads the current value
//! from it; every clone sees the same value.  Listeners run after each change,
//! never when a set leaves the value as it was.
//!
//! Booleans are entered and printed as `0` / `1`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use super::args::{ArgKind, ArgValue};

/// Callback run after a variable changes.
pub type CVarListener = Rc<dyn Fn(&CVar)>;

/// Why a value was not stored.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CVarError {
    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },

    #[error("can't toggle non-int variable '{0}'")]
    NotToggleable(String),
}

struct CVarState {
    name: String,
    default: ArgValue,
    value: RefCell<ArgValue>,
    system: bool,
    listeners: RefCell<Vec<CVarListener>>,
}

/// Shared handle to a console variable.
#[derive(Clone)]
pub struct CVar(Rc<CVarState>);

impl CVar {
    pub fn new(name: impl Into<String>, default: impl Into<ArgValue>) -> Self {
        Self::build(name.into(), default.into(), false)
    }

    /// A variable `cvarlist` only shows with `--all`.
    pub fn system(name: impl Into<String>, default: impl Into<ArgValue>) -> Self {
        Self::build(name.into(), default.into(), true)
    }

    fn build(name: String, default: ArgValue, system: bool) -> Self {
        Self(Rc::new(CVarState {
            name,
            value: RefCell::new(default.clone()),
            default,
            system,
            listeners: RefCell::new(Vec::new()),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> ArgKind {
        kind_of(&self.0.default)
    }

    pub fn is_system(&self) -> bool {
        self.0.system
    }

    pub fn value(&self) -> ArgValue {
        self.0.value.borrow().clone()
    }

    pub fn default_value(&self) -> &ArgValue {
        &self.0.default
    }

    pub fn is_default(&self) -> bool {
        *self.0.value.borrow() == self.0.default
    }

    pub fn bool_value(&self) -> bool {
        self.int_value() != 0
    }

    /// The value as an integer; floats truncate, unparsable strings are 0.
    pub fn int_value(&self) -> i64 {
        match &*self.0.value.borrow() {
            ArgValue::Bool(v) => i64::from(*v),
            ArgValue::Int(v) => *v,
            ArgValue::Float(v) => *v as i64,
            ArgValue::Str(v) => v.trim().parse().unwrap_or(0),
        }
    }

    pub fn float_value(&self) -> f64 {
        match &*self.0.value.borrow() {
            ArgValue::Bool(v) => f64::from(u8::from(*v)),
            ArgValue::Int(v) => *v as f64,
            ArgValue::Float(v) => *v,
            ArgValue::Str(v) => v.trim().parse().unwrap_or(0.0),
        }
    }

    /// The value as typed at the prompt.
    pub fn text(&self) -> String {
        format_value(&self.0.value.borrow())
    }

    pub fn default_text(&self) -> String {
        format_value(&self.0.default)
    }

    /// Parses `token` as this variable's kind and stores it.
    ///
    /// Returns whether the value changed.
    ///
    /// # Errors
    ///
    /// [`CVarError::InvalidValue`] if the token does not parse.  Booleans
    /// accept only `0` and `1`.
    pub fn set_from_str(&self, token: &str) -> Result<bool, CVarError> {
        let invalid = |reason: &str| CVarError::InvalidValue {
            name: self.name().to_string(),
            value: token.to_string(),
            reason: reason.to_string(),
        };
        let value = match self.kind() {
            ArgKind::Bool => match token {
                "0" => ArgValue::Bool(false),
                "1" => ArgValue::Bool(true),
                _ => return Err(invalid("only '0' and '1' are permitted")),
            },
            kind => kind.parse(token).map_err(|reason| invalid(&reason))?,
        };
        Ok(self.store(value))
    }

    /// Stores `value`, converting between int and float as needed.
    ///
    /// # Errors
    ///
    /// [`CVarError::InvalidValue`] if `value` has an unrelated kind.
    pub fn set(&self, value: impl Into<ArgValue>) -> Result<bool, CVarError> {
        let value = value.into();
        let converted = match (self.kind(), value) {
            (ArgKind::Float, ArgValue::Int(v)) => ArgValue::Float(v as f64),
            (ArgKind::Int, ArgValue::Float(v)) => ArgValue::Int(v as i64),
            (ArgKind::Bool, ArgValue::Int(v @ (0 | 1))) => ArgValue::Bool(v == 1),
            (kind, value) if kind_of(&value) == kind => value,
            (kind, value) => {
                return Err(CVarError::InvalidValue {
                    name: self.name().to_string(),
                    value: value.to_string(),
                    reason: format!("expected {}", kind.label()),
                })
            }
        };
        Ok(self.store(converted))
    }

    /// Restores the default.  Returns whether the value changed.
    pub fn reset(&self) -> bool {
        self.store(self.0.default.clone())
    }

    /// Flips a bool, or sets an int to `1` when it is `0` and to `0` otherwise.
    ///
    /// # Errors
    ///
    /// [`CVarError::NotToggleable`] for float and string variables.
    pub fn toggle(&self) -> Result<bool, CVarError> {
        let next = match self.kind() {
            ArgKind::Bool => ArgValue::Bool(!self.bool_value()),
            ArgKind::Int => ArgValue::Int(i64::from(!self.bool_value())),
            _ => return Err(CVarError::NotToggleable(self.name().to_string())),
        };
        Ok(self.store(next))
    }

    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn(&CVar) + 'static,
    {
        self.0.listeners.borrow_mut().push(Rc::new(listener));
    }

    fn store(&self, value: ArgValue) -> bool {
        if *self.0.value.borrow() == value {
            return false;
        }
        *self.0.value.borrow_mut() = value;
        // Listeners may add listeners or read the variable.
        let listeners: Vec<CVarListener> = self.0.listeners.borrow().clone();
        for listener in listeners {
            listener(self);
        }
        true
    }
}

impl PartialEq for CVar {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for CVar {}

impl fmt::Debug for CVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CVar")
            .field("name", &self.0.name)
            .field("value", &*self.0.value.borrow())
            .field("default", &self.0.default)
            .finish()
    }
}

fn kind_of(value: &ArgValue) -> ArgKind {
    match value {
        ArgValue::Int(_) => ArgKind::Int,
        ArgValue::Float(_) => ArgKind::Float,
        ArgValue::Bool(_) => ArgKind::Bool,
        ArgValue::Str(_) => ArgKind::Str,
    }
}

fn format_value(value: &ArgValue) -> String {
    match value {
        ArgValue::Bool(v) => u8::from(*v).to_string(),
        other => other.to_string(),
    }
}
