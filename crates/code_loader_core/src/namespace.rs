//! Explicit binding table for dynamically loaded code.
//!
//! A [`CodeRuntime`] receives an empty [`ExecutionNamespace`], evaluates the
//! fetched source, and binds every name the source introduced. The loader
//! then looks up its entry point by name; nothing is read from an ambient
//! global scope.

use std::collections::BTreeMap;

use serde_json::Value;

/// Entry point exposed by loaded code.
pub trait Callable {
    fn call(&self, event: &Value, context: &Value) -> Result<Value, String>;
}

/// Output the loaded code wrote to its console, drained once per invocation.
pub trait ConsoleCapture {
    fn drain(&self) -> Vec<String>;
}

pub trait CodeRuntime {
    fn load(&self, source: &str, namespace: &mut ExecutionNamespace) -> Result<(), String>;
}

pub enum Binding {
    Callable(Box<dyn Callable>),
    Value { type_name: String },
}

impl Binding {
    pub fn type_name(&self) -> &str {
        match self {
            Self::Callable(_) => "function",
            Self::Value { type_name } => type_name,
        }
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Callable(_) => f.write_str("Callable"),
            Self::Value { type_name } => f
                .debug_struct("Value")
                .field("type_name", type_name)
                .finish(),
        }
    }
}

#[derive(Default)]
pub struct ExecutionNamespace {
    bindings: BTreeMap<String, Binding>,
    console: Option<Box<dyn ConsoleCapture>>,
}

impl ExecutionNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name`, replacing any earlier binding of the same name.
    pub fn bind(&mut self, name: impl Into<String>, binding: Binding) {
        self.bindings.insert(name.into(), binding);
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub fn callable(&self, name: &str) -> Option<&dyn Callable> {
        match self.bindings.get(name)? {
            Binding::Callable(callable) => Some(callable.as_ref()),
            Binding::Value { .. } => None,
        }
    }

    /// Bindings in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.bindings
            .iter()
            .map(|(name, binding)| (name.as_str(), binding))
    }

    pub fn attach_console(&mut self, console: Box<dyn ConsoleCapture>) {
        self.console = Some(console);
    }

    pub fn drain_console(&self) -> Vec<String> {
        self.console
            .as_ref()
            .map(|console| console.drain())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for ExecutionNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionNamespace")
            .field("bindings", &self.bindings)
            .field("console_attached", &self.console.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde_json::json;

    use super::*;

    struct Echo;

    impl Callable for Echo {
        fn call(&self, event: &Value, context: &Value) -> Result<Value, String> {
            Ok(json!({"event": event, "context": context}))
        }
    }

    struct FixedConsole {
        lines: RefCell<Vec<String>>,
    }

    impl ConsoleCapture for FixedConsole {
        fn drain(&self) -> Vec<String> {
            self.lines.borrow_mut().drain(..).collect()
        }
    }

    #[test]
    fn starts_empty() {
        let namespace = ExecutionNamespace::new();
        assert!(namespace.iter().next().is_none());
        assert!(namespace.get("handler").is_none());
        assert!(namespace.drain_console().is_empty());
    }

    #[test]
    fn resolves_callable_bindings_only() {
        let mut namespace = ExecutionNamespace::new();
        namespace.bind("handler", Binding::Callable(Box::new(Echo)));
        namespace.bind(
            "VERSION",
            Binding::Value {
                type_name: "string".to_string(),
            },
        );

        let handler = namespace.callable("handler").expect("handler should be callable");
        let result = handler
            .call(&json!({"a": 1}), &json!({"aws_request_id": "r"}))
            .expect("echo should succeed");
        assert_eq!(result["event"]["a"], 1);
        assert!(namespace.callable("VERSION").is_none());
        assert_eq!(namespace.get("VERSION").map(Binding::type_name), Some("string"));
        let listed: Vec<(&str, &str)> = namespace
            .iter()
            .map(|(name, binding)| (name, binding.type_name()))
            .collect();
        assert_eq!(listed, vec![("VERSION", "string"), ("handler", "function")]);
    }

    #[test]
    fn later_binding_replaces_earlier() {
        let mut namespace = ExecutionNamespace::new();
        namespace.bind("handler", Binding::Callable(Box::new(Echo)));
        namespace.bind(
            "handler",
            Binding::Value {
                type_name: "number".to_string(),
            },
        );

        assert_eq!(namespace.iter().count(), 1);
        assert!(namespace.callable("handler").is_none());
    }

    #[test]
    fn console_drains_once() {
        let mut namespace = ExecutionNamespace::new();
        namespace.attach_console(Box::new(FixedConsole {
            lines: RefCell::new(vec!["hello".to_string()]),
        }));

        assert_eq!(namespace.drain_console(), vec!["hello".to_string()]);
        assert!(namespace.drain_console().is_empty());
    }
}
