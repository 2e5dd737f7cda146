//! Remote value rendering.
//!
//! Converts a protocol value reference into a JSON-safe value. Inline
//! primitives pass through; object references are serialized host-side by a
//! depth-first walk over the target's own-property enumeration, with a
//! visited set substituting a sentinel for repeated nodes. Every failure
//! path degrades to a best-effort value; this function never errors.

use std::collections::HashSet;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::{Map, Value};

use cdp_bridge_core::types::{PropertyDescriptor, RemoteObject};
use cdp_bridge_core::{DebuggerProtocol, Result, TargetId};

/// Substituted for any object node already seen during one rendering pass.
pub const CIRCULAR_SENTINEL: &str = "[Circular]";

/// Marker for explicitly-undefined values, which JSON cannot express.
pub const UNDEFINED_SENTINEL: &str = "undefined";

/// Last-resort conversion evaluated against the object itself.
const TO_STRING_FN: &str = "function() { return String(this); }";

pub async fn render_remote_value(
    proto: &dyn DebuggerProtocol,
    target: &TargetId,
    arg: &RemoteObject,
) -> Value {
    if let Some(value) = &arg.value {
        return value.clone();
    }

    if arg.is_undefined() {
        return Value::String(UNDEFINED_SENTINEL.to_string());
    }

    if let Some(object_id) = &arg.object_id {
        // Functions have reference identity but no useful own properties;
        // render their source text instead of an empty object.
        if !arg.is_function() {
            let mut visited = HashSet::new();
            match serialize_object(proto, target, object_id, arg.is_array(), &mut visited).await {
                Ok(value) => return value,
                Err(e) => {
                    tracing::debug!(target_id = %target, "object serialization failed: {e}");
                }
            }
        }

        if let Ok(value) = proto.call_function_on(target, object_id, TO_STRING_FN).await {
            if !value.is_null() {
                return value;
            }
        }
    }

    arg.description
        .clone()
        .map(Value::String)
        .unwrap_or(Value::Null)
}

/// Depth-first traversal of a remote object graph. One protocol round trip
/// per node; cycles (and re-visited DAG nodes) collapse to the sentinel.
fn serialize_object<'a>(
    proto: &'a dyn DebuggerProtocol,
    target: &'a TargetId,
    object_id: &'a str,
    as_array: bool,
    visited: &'a mut HashSet<String>,
) -> BoxFuture<'a, Result<Value>> {
    async move {
        if !visited.insert(object_id.to_string()) {
            return Ok(Value::String(CIRCULAR_SENTINEL.to_string()));
        }

        let properties = proto.get_properties(target, object_id).await?;

        if as_array {
            let mut items: Vec<(usize, Value)> = Vec::new();
            for prop in &properties {
                if !prop.enumerable {
                    continue;
                }
                let Ok(index) = prop.name.parse::<usize>() else {
                    continue;
                };
                let rendered = render_property(proto, target, prop, visited).await?;
                items.push((index, rendered.unwrap_or(Value::Null)));
            }
            items.sort_by_key(|(index, _)| *index);
            Ok(Value::Array(items.into_iter().map(|(_, v)| v).collect()))
        } else {
            let mut map = Map::new();
            for prop in &properties {
                if !prop.enumerable {
                    continue;
                }
                if let Some(rendered) = render_property(proto, target, prop, visited).await? {
                    map.insert(prop.name.clone(), rendered);
                }
            }
            Ok(Value::Object(map))
        }
    }
    .boxed()
}

/// Render one property value. `None` means the property is omitted from an
/// object (undefined and function values, per JSON semantics); inside arrays
/// the caller substitutes `null` instead.
async fn render_property(
    proto: &dyn DebuggerProtocol,
    target: &TargetId,
    prop: &PropertyDescriptor,
    visited: &mut HashSet<String>,
) -> Result<Option<Value>> {
    let Some(value) = &prop.value else {
        return Ok(None);
    };

    if let Some(inline) = &value.value {
        return Ok(Some(inline.clone()));
    }

    if value.is_undefined() || value.is_function() {
        return Ok(None);
    }

    if let Some(object_id) = &value.object_id {
        let rendered =
            serialize_object(proto, target, object_id, value.is_array(), visited).await?;
        return Ok(Some(rendered));
    }

    Ok(value.description.clone().map(Value::String))
}
