//! The mirror-side session runtime, authored in the view language.
//!
//! The runtime routes backend messages (`class`, `new`, `state_change`,
//! `delete`) to mirror instances and sends `user_event` requests back. It is
//! compiled by the same pipeline as every view, so a host page only needs
//! the output of [`mirror_runtime`] plus `new MirrorRuntime(socket)`.

use crate::error::CompileResult;
use crate::{compile_source, JavaScript, Replacements};

/// View-language source of the mirror runtime.
pub const MIRROR_RUNTIME_SOURCE: &str = r#"
class MirrorRuntime:
    def constructor(socket):
        this.socket = socket
        this.definitions = {}
        this.components = {}
        socket.addEventListener("message", lambda event: this.receive(JSON.parse(event.data)))

    def receive(message):
        kind = message["type"]
        if kind == "class":
            this.definitions[message["clss"]] = eval("(" + message["defn"] + ")")
        elif kind == "new":
            Definition = this.definitions[message["clss"]]
            component = Definition()
            component.comp_id = message["comp_id"]
            component.state = {}
            component.ask_update = this.sender(message["comp_id"])
            this.components[message["comp_id"]] = component
        elif kind == "state_change":
            component = this.components[message["comp_id"]]
            if component == undefined:
                return
            change = this.resolve(message["state_change"])
            Object.assign(component.state, change)
            if component.handle != undefined:
                component.handle(change)
        elif kind == "delete":
            del this.components[message["comp_id"]]

    def sender(comp_id):
        return lambda payload: this.ask_update(comp_id, payload)

    def ask_update(comp_id, payload):
        message = {"type": "user_event", "comp_id": comp_id, "user_event": payload}
        this.socket.send(JSON.stringify(message))

    def resolve(value):
        if Array.isArray(value):
            return value.map(lambda item: this.resolve(item))
        if is_plain_object(value):
            if value["comp_id"] != undefined and Object.keys(value).length == 1:
                return this.components[value["comp_id"]]
            resolved = {}
            for key, item in value.items():
                resolved[key] = this.resolve(item)
            return resolved
        return value
"#;

/// Replacements used by the runtime on top of the defaults.
pub fn runtime_replacements() -> Replacements {
    Replacements::default().with(
        "is_plain_object",
        "((v) => v !== null && typeof v === \"object\" && !Array.isArray(v))",
    )
}

/// Compile the mirror runtime to JavaScript.
pub fn mirror_runtime() -> CompileResult<String> {
    let items = compile_source(
        "mirror_runtime",
        MIRROR_RUNTIME_SOURCE,
        &runtime_replacements(),
        &JavaScript,
    )?;
    let sources: Vec<String> = items.into_iter().map(|item| item.source).collect();
    Ok(sources.join("\n\n"))
}
