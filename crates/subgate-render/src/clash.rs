//! Structured-config subscription rendering (Clash format).

use serde_yaml::{Mapping, Value};
use subgate_link::{ProxyDescriptor, TlsOptions, Transport, decode};
use subgate_store::{CustomerRecord, Slot};
use tracing::warn;

use crate::error::RenderError;
use crate::slot_remark;

/// Render the structured-config subscription document.
///
/// Each slot contributes one typed proxy entry, preferring the node's
/// manual descriptor over decoding its share link. A slot whose link cannot
/// be decoded is skipped with a warning; if both slots are skipped the
/// render fails with [`RenderError::NoRenderableProxy`]. Warnings appear as
/// `# WARNING:` comment lines before the document body.
pub fn render_clash(record: &CustomerRecord) -> Result<String, RenderError> {
    let mut proxies = Vec::new();
    let mut proxy_names = Vec::new();
    let mut warnings = Vec::new();

    for slot in Slot::ALL {
        let node = record.effective_node(slot);
        let name = slot_remark(record, slot);

        let descriptor = match &node.descriptor {
            Some(descriptor) => Some(descriptor.clone()),
            None => match decode(&node.share) {
                Ok(descriptor) => Some(descriptor),
                Err(e) => {
                    warn!(
                        customer = %record.name,
                        slot = slot.as_str(),
                        error = %e,
                        "slot has no usable descriptor, skipping"
                    );
                    warnings.push(format!(
                        "{} node has no usable descriptor, skipped: {}",
                        slot.as_str(),
                        record.name
                    ));
                    None
                }
            },
        };

        if let Some(descriptor) = descriptor {
            proxies.push(proxy_entry(&name, &descriptor));
            proxy_names.push(name);
        }
    }

    if proxies.is_empty() {
        return Err(RenderError::NoRenderableProxy);
    }

    let mut doc = Mapping::new();
    insert(&mut doc, "mixed-port", 7890);
    insert(&mut doc, "allow-lan", false);
    insert(&mut doc, "mode", "rule");
    insert(&mut doc, "log-level", "info");
    insert(&mut doc, "proxies", Value::Sequence(proxies));

    let mut group = Mapping::new();
    insert(&mut group, "name", "Proxy");
    insert(&mut group, "type", "select");
    insert(
        &mut group,
        "proxies",
        Value::Sequence(proxy_names.into_iter().map(Value::from).collect()),
    );
    insert(
        &mut doc,
        "proxy-groups",
        Value::Sequence(vec![Value::Mapping(group)]),
    );
    insert(
        &mut doc,
        "rules",
        Value::Sequence(vec![Value::from("MATCH,Proxy")]),
    );

    let body = serde_yaml::to_string(&Value::Mapping(doc))?;
    if warnings.is_empty() {
        Ok(body)
    } else {
        let comments: String = warnings
            .iter()
            .map(|w| format!("# WARNING: {w}\n"))
            .collect();
        Ok(format!("{comments}{body}"))
    }
}

fn insert(mapping: &mut Mapping, key: &str, value: impl Into<Value>) {
    mapping.insert(Value::from(key), value.into());
}

/// One proxy entry: name first, then the scheme-specific fields Clash
/// expects for that proxy type.
fn proxy_entry(name: &str, descriptor: &ProxyDescriptor) -> Value {
    let mut entry = Mapping::new();
    insert(&mut entry, "name", name);
    insert(&mut entry, "type", descriptor.scheme());
    insert(&mut entry, "server", descriptor.server());
    insert(&mut entry, "port", descriptor.port());

    match descriptor {
        ProxyDescriptor::Ss {
            cipher, password, ..
        } => {
            insert(&mut entry, "cipher", cipher.as_str());
            insert(&mut entry, "password", password.as_str());
        }
        ProxyDescriptor::Socks5 {
            username, password, ..
        } => {
            if let Some(username) = username {
                insert(&mut entry, "username", username.as_str());
            }
            if let Some(password) = password {
                insert(&mut entry, "password", password.as_str());
            }
        }
        ProxyDescriptor::Vmess {
            id,
            alter_id,
            cipher,
            transport,
            tls,
            ..
        } => {
            insert(&mut entry, "uuid", id.to_string());
            insert(&mut entry, "alterId", *alter_id);
            insert(&mut entry, "cipher", cipher.as_str());
            vmess_transport(&mut entry, transport);
            vmess_tls(&mut entry, tls);
        }
        // Manually authored variants: pass the author's fields through.
        ProxyDescriptor::Vless { extra, .. }
        | ProxyDescriptor::Trojan { extra, .. }
        | ProxyDescriptor::Http { extra, .. } => {
            for (key, value) in extra {
                if let Ok(value) = serde_yaml::to_value(value) {
                    entry.insert(Value::from(key.as_str()), value);
                }
            }
        }
    }

    Value::Mapping(entry)
}

fn vmess_transport(entry: &mut Mapping, transport: &Transport) {
    match transport {
        Transport::Tcp => {}
        Transport::Ws { path, host } => {
            insert(entry, "network", "ws");
            let mut opts = Mapping::new();
            if let Some(path) = path {
                insert(&mut opts, "path", path.as_str());
            }
            if let Some(host) = host {
                let mut headers = Mapping::new();
                insert(&mut headers, "Host", host.as_str());
                insert(&mut opts, "headers", Value::Mapping(headers));
            }
            insert(entry, "ws-opts", Value::Mapping(opts));
        }
        Transport::Grpc { service_name } => {
            insert(entry, "network", "grpc");
            let mut opts = Mapping::new();
            if let Some(service_name) = service_name {
                insert(&mut opts, "grpc-service-name", service_name.as_str());
            }
            insert(entry, "grpc-opts", Value::Mapping(opts));
        }
    }
}

fn vmess_tls(entry: &mut Mapping, tls: &TlsOptions) {
    if !tls.enabled {
        return;
    }
    insert(entry, "tls", true);
    if let Some(sni) = &tls.sni {
        insert(entry, "servername", sni.as_str());
    }
    if !tls.alpn.is_empty() {
        insert(
            entry,
            "alpn",
            Value::Sequence(tls.alpn.iter().map(|a| Value::from(a.as_str())).collect()),
        );
    }
}
