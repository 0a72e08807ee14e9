//! Demo action: greets whoever is named in the invocation's value.
//!
//! ```text
//! curl -X POST -d '{"value":{"name":"Ada"}}' http://localhost:8080/run
//! ```

use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
struct Greeting {
    greeting: String,
}

fn hello(params: Value) -> Result<Greeting, String> {
    let name = match &params["name"] {
        Value::Null => "stranger",
        Value::String(name) => name.as_str(),
        other => return Err(format!("name must be a string, got {}", other)),
    };

    tracing::info!("Greeting {}", name);

    Ok(Greeting {
        greeting: format!("Hello {}!", name),
    })
}

fn main() {
    action_shim::register_action(hello);
}
