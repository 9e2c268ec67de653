//! Classification of positional `gtag(command, ...)` arguments.

use serde_json::{Map, Value};

/// One call to the primary entry point, classified by its command tag.
#[derive(Clone, Debug, PartialEq)]
pub enum GtagCommand {
    /// `gtag('event', name, params?)`
    Event {
        name: String,
        params: Map<String, Value>,
    },
    /// `gtag('config', target, params?)`
    Config {
        target: Option<String>,
        params: Map<String, Value>,
    },
    /// `gtag('set', params)` or `gtag('set', scope, params)`
    Set {
        scope: Option<String>,
        params: Map<String, Value>,
    },
    /// Anything else, including calls whose arguments do not have the expected shape.
    Unknown { tag: Option<String> },
}

impl GtagCommand {
    pub fn classify(args: &[Value]) -> Self {
        let tag = args.first().and_then(Value::as_str);
        match tag {
            Some("event") => match args.get(1).and_then(Value::as_str) {
                Some(name) if !name.trim().is_empty() => GtagCommand::Event {
                    name: name.to_string(),
                    params: object_at(args, 2),
                },
                _ => {
                    log::debug!("gtag event call without a usable name");
                    GtagCommand::Unknown {
                        tag: Some("event".into()),
                    }
                }
            },
            Some("config") => match args.get(1) {
                Some(Value::Object(params)) => GtagCommand::Config {
                    target: None,
                    params: params.clone(),
                },
                target => GtagCommand::Config {
                    target: target.and_then(Value::as_str).map(str::to_string),
                    params: object_at(args, 2),
                },
            },
            Some("set") => match args.get(1) {
                Some(Value::Object(params)) => GtagCommand::Set {
                    scope: None,
                    params: params.clone(),
                },
                Some(Value::String(scope)) => GtagCommand::Set {
                    scope: Some(scope.clone()),
                    params: object_at(args, 2),
                },
                _ => GtagCommand::Set {
                    scope: None,
                    params: Map::new(),
                },
            },
            other => GtagCommand::Unknown {
                tag: other.map(str::to_string),
            },
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            GtagCommand::Event { .. } => Some("event"),
            GtagCommand::Config { .. } => Some("config"),
            GtagCommand::Set { .. } => Some("set"),
            GtagCommand::Unknown { tag } => tag.as_deref(),
        }
    }
}

fn object_at(args: &[Value], index: usize) -> Map<String, Value> {
    match args.get(index) {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}
