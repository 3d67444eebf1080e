use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use boa_engine::{Context, JsError, JsValue, Source};
use serde_json::Value;

use crate::runtime::contract::HANDLER_BINDING;
use crate::runtime::namespace::{Binding, Callable, CodeRuntime, ConsoleCapture, ExecutionNamespace};

// Installed before the baseline snapshot, so neither `console` nor
// `__loader_bridge` is reported as a binding of the loaded source. The bridge
// keeps its own copies of the built-ins it needs; loaded code may shadow the
// globals.
const LOADER_SHIM: &str = r#"
(function (global) {
    var stringify = JSON.stringify;
    var parse = JSON.parse;
    var toText = String;
    var ownNames = Object.getOwnPropertyNames;
    var lines = [];
    var settled = null;

    function envelope(key, value) {
        var out = {};
        out[key] = value === undefined ? null : value;
        try {
            return stringify(out);
        } catch (e) {
            return stringify({ "error": toText(e) });
        }
    }
    function isThenable(value) {
        return value !== null
            && (typeof value === 'object' || typeof value === 'function')
            && typeof value.then === 'function';
    }
    function write(args) {
        var parts = [];
        for (var i = 0; i < args.length; i++) {
            var value = args[i];
            if (typeof value === 'object' && value !== null) {
                try { parts[parts.length] = stringify(value); } catch (e) { parts[parts.length] = toText(value); }
            } else {
                parts[parts.length] = toText(value);
            }
        }
        lines[lines.length] = parts.join(' ');
    }

    global.console = {
        log: function () { write(arguments); },
        info: function () { write(arguments); },
        warn: function () { write(arguments); },
        error: function () { write(arguments); },
        debug: function () { write(arguments); }
    };
    global.__loader_bridge = {
        drainConsole: function () { return stringify(lines.splice(0, lines.length)); },
        snapshot: function () {
            var names = ownNames(global);
            var entries = [];
            for (var i = 0; i < names.length; i++) {
                var value;
                try { value = global[names[i]]; } catch (e) { value = undefined; }
                entries[entries.length] = [names[i], typeof value];
            }
            return stringify(entries);
        },
        // Returns the result envelope, or undefined while a returned Promise
        // is pending; `settled` then holds it once the job queue has run.
        call: function (handler, eventJson, contextJson) {
            settled = null;
            try {
                var result = handler(parse(eventJson), parse(contextJson));
                if (isThenable(result)) {
                    result.then(
                        function (value) { settled = envelope('ok', value); },
                        function (reason) { settled = envelope('error', toText(reason)); }
                    );
                    return undefined;
                }
                return envelope('ok', result);
            } catch (e) {
                return envelope('error', toText(e));
            }
        },
        settled: function () { return settled === null ? undefined : settled; }
    };
})(globalThis);
"#;

/// JavaScript runtime backed by `boa_engine`. Every `load` builds a fresh
/// interpreter context, so nothing survives between invocations.
#[derive(Debug, Clone, Copy)]
pub struct BoaRuntime {
    capture_console: bool,
}

impl BoaRuntime {
    pub fn new(capture_console: bool) -> Self {
        Self { capture_console }
    }
}

impl Default for BoaRuntime {
    fn default() -> Self {
        Self::new(true)
    }
}

impl CodeRuntime for BoaRuntime {
    fn load(&self, source: &str, namespace: &mut ExecutionNamespace) -> Result<(), String> {
        let context = Rc::new(RefCell::new(Context::default()));

        eval_script(&context, LOADER_SHIM)
            .map_err(|error| format!("failed to install loader bridge: {error}"))?;
        if self.capture_console {
            namespace.attach_console(Box::new(BoaConsole {
                context: Rc::clone(&context),
            }));
        }

        let baseline = snapshot_globals(&context)?;

        let evaluated = context.borrow_mut().eval(Source::from_bytes(source));
        if let Err(error) = evaluated {
            return Err(describe_error(&context, &error));
        }

        for (name, type_name) in snapshot_globals(&context)? {
            if baseline.contains_key(&name) {
                continue;
            }
            let binding = if type_name == "function" {
                Binding::Callable(Box::new(BoaFunction {
                    context: Rc::clone(&context),
                    accessor: global_accessor(&name)?,
                }))
            } else {
                Binding::Value { type_name }
            };
            namespace.bind(name, binding);
        }

        // Top-level `let`/`const` declarations never reach the global object.
        if namespace.get(HANDLER_BINDING).is_none() {
            let declared = eval_script(&context, &format!("typeof {HANDLER_BINDING}"))?;
            match declared.as_deref() {
                Some("function") => namespace.bind(
                    HANDLER_BINDING,
                    Binding::Callable(Box::new(BoaFunction {
                        context: Rc::clone(&context),
                        accessor: HANDLER_BINDING.to_string(),
                    })),
                ),
                Some("undefined") | None => {}
                Some(other) => namespace.bind(
                    HANDLER_BINDING,
                    Binding::Value {
                        type_name: other.to_string(),
                    },
                ),
            }
        }

        Ok(())
    }
}

struct BoaFunction {
    context: Rc<RefCell<Context>>,
    accessor: String,
}

impl Callable for BoaFunction {
    fn call(&self, event: &Value, context: &Value) -> Result<Value, String> {
        let script = format!(
            "__loader_bridge.call({}, {}, {})",
            self.accessor,
            js_string_literal(&event.to_string())?,
            js_string_literal(&context.to_string())?,
        );

        let output = match eval_script(&self.context, &script)? {
            Some(output) => output,
            None => {
                self.context.borrow_mut().run_jobs();
                eval_script(&self.context, "__loader_bridge.settled()")?
                    .ok_or_else(|| "handler returned a Promise that never settled".to_string())?
            }
        };

        let mut envelope: serde_json::Map<String, Value> = serde_json::from_str(&output)
            .map_err(|error| format!("failed to parse handler result: {error}"))?;
        if let Some(error) = envelope.remove("error") {
            return Err(error
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string()));
        }
        Ok(envelope.remove("ok").unwrap_or(Value::Null))
    }
}

struct BoaConsole {
    context: Rc<RefCell<Context>>,
}

impl ConsoleCapture for BoaConsole {
    fn drain(&self) -> Vec<String> {
        eval_script(&self.context, "__loader_bridge.drainConsole()")
            .ok()
            .flatten()
            .and_then(|output| serde_json::from_str(&output).ok())
            .unwrap_or_default()
    }
}

/// Evaluates `script` and returns its value when it is a string.
fn eval_script(context: &Rc<RefCell<Context>>, script: &str) -> Result<Option<String>, String> {
    let evaluated = context.borrow_mut().eval(Source::from_bytes(script));
    let value: JsValue = evaluated.map_err(|error| describe_error(context, &error))?;
    Ok(value.as_string().map(|text| text.to_std_string_escaped()))
}

/// Renders a thrown value the way `String(e)` would inside the script.
fn describe_error(context: &Rc<RefCell<Context>>, error: &JsError) -> String {
    let mut context = context.borrow_mut();
    let thrown = error.to_opaque(&mut context);
    thrown
        .to_string(&mut context)
        .map(|text| text.to_std_string_escaped())
        .unwrap_or_else(|_| error.to_string())
}

fn snapshot_globals(context: &Rc<RefCell<Context>>) -> Result<BTreeMap<String, String>, String> {
    let output = eval_script(context, "__loader_bridge.snapshot()")?
        .ok_or_else(|| "global snapshot did not produce a string".to_string())?;
    let entries: Vec<(String, String)> = serde_json::from_str(&output)
        .map_err(|error| format!("invalid global snapshot: {error}"))?;
    Ok(entries.into_iter().collect())
}

fn global_accessor(name: &str) -> Result<String, String> {
    Ok(format!("globalThis[{}]", js_string_literal(name)?))
}

fn js_string_literal(text: &str) -> Result<String, String> {
    serde_json::to_string(text)
        .map_err(|error| format!("failed to encode string literal: {error}"))
}
