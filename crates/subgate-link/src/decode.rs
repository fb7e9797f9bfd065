//! Share-link decoding.

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use serde::Deserialize;
use uuid::Uuid;

use crate::descriptor::{ProxyDescriptor, TlsOptions, Transport};
use crate::error::DecodeError;

/// Decode a share link into a normalized [`ProxyDescriptor`].
///
/// Dispatches on the case-insensitive scheme prefix. `vless://`,
/// `trojan://` and `http://` are intentionally opaque and always return
/// [`DecodeError::UnsupportedScheme`]; a node carrying one of those needs a
/// manually authored descriptor.
pub fn decode(share: &str) -> Result<ProxyDescriptor, DecodeError> {
    let (scheme, rest) = share
        .split_once("://")
        .ok_or(DecodeError::Malformed("missing scheme separator"))?;

    match scheme.to_ascii_lowercase().as_str() {
        "ss" => decode_ss(rest),
        "socks5" | "socks" => decode_socks(rest),
        "vmess" => decode_vmess(rest),
        other => Err(DecodeError::UnsupportedScheme(other.to_string())),
    }
}

/// Drop a trailing `#fragment`, if any.
fn strip_fragment(s: &str) -> &str {
    match s.split_once('#') {
        Some((body, _)) => body,
        None => s,
    }
}

/// Base64-decode tolerating missing padding.
fn base64_loose(s: &str) -> Result<Vec<u8>, DecodeError> {
    let s = s.trim();
    STANDARD
        .decode(s)
        .or_else(|_| STANDARD_NO_PAD.decode(s))
        .map_err(DecodeError::from)
}

fn base64_utf8(s: &str) -> Result<String, DecodeError> {
    String::from_utf8(base64_loose(s)?).map_err(|_| DecodeError::Utf8)
}

/// Split `host:port`, validating the port is numeric and in 1-65535.
fn split_host_port(s: &str) -> Result<(String, u16), DecodeError> {
    let (host, port) = s
        .rsplit_once(':')
        .ok_or(DecodeError::Malformed("missing port"))?;
    let port: u16 = port
        .parse()
        .map_err(|_| DecodeError::InvalidPort(port.to_string()))?;
    if port == 0 {
        return Err(DecodeError::InvalidPort(port.to_string()));
    }
    Ok((host.to_string(), port))
}

/// `ss://` layouts, both in the wild:
///
/// - `ss://base64(method:password)@host:port`
/// - `ss://base64(method:password@host:port)` (legacy, fully wrapped)
fn decode_ss(rest: &str) -> Result<ProxyDescriptor, DecodeError> {
    let rest = strip_fragment(rest);

    let (credentials, host_port) = match rest.rsplit_once('@') {
        Some((b64, host_port)) => (base64_utf8(b64)?, host_port.to_string()),
        None => {
            let plain = base64_utf8(rest)?;
            let (credentials, host_port) = plain
                .rsplit_once('@')
                .ok_or(DecodeError::Malformed("missing '@' in ss payload"))?;
            (credentials.to_string(), host_port.to_string())
        }
    };

    let (cipher, password) = credentials
        .split_once(':')
        .ok_or(DecodeError::Malformed("missing ':' in ss credentials"))?;
    let (server, port) = split_host_port(&host_port)?;

    Ok(ProxyDescriptor::Ss {
        server,
        port,
        cipher: cipher.to_string(),
        password: password.to_string(),
    })
}

/// `socks5://[user[:pass]@]host:port` (also accepts the `socks://` alias).
fn decode_socks(rest: &str) -> Result<ProxyDescriptor, DecodeError> {
    let rest = strip_fragment(rest);

    let (username, password, host_port) = match rest.rsplit_once('@') {
        Some((userinfo, host_port)) => match userinfo.split_once(':') {
            Some((user, pass)) => (
                Some(user.to_string()),
                Some(pass.to_string()),
                host_port,
            ),
            None => (Some(userinfo.to_string()), None, host_port),
        },
        None => (None, None, rest),
    };

    let (server, port) = split_host_port(host_port)?;
    Ok(ProxyDescriptor::Socks5 {
        server,
        port,
        username,
        password,
    })
}

/// vmess share-JSON body. v2rayN emits `port` and `aid` as either strings
/// or numbers, so both fields go through a lenient deserializer.
#[derive(Debug, Deserialize)]
struct VmessBody {
    add: String,
    #[serde(deserialize_with = "lenient_u16")]
    port: u16,
    id: Uuid,
    #[serde(default, deserialize_with = "lenient_u16_opt")]
    aid: Option<u16>,
    #[serde(default)]
    scy: Option<String>,
    #[serde(default)]
    net: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    tls: Option<String>,
    #[serde(default)]
    sni: Option<String>,
    #[serde(default)]
    alpn: Option<String>,
}

fn lenient_u16<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .ok_or_else(|| D::Error::custom("number out of u16 range")),
        serde_json::Value::String(s) => s
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid number: {s:?}"))),
        other => Err(D::Error::custom(format!(
            "expected number or string, got {other}"
        ))),
    }
}

fn lenient_u16_opt<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    lenient_u16(deserializer).map(Some)
}

/// `vmess://base64(json)`.
fn decode_vmess(rest: &str) -> Result<ProxyDescriptor, DecodeError> {
    let bytes = base64_loose(strip_fragment(rest))?;
    let body: VmessBody = serde_json::from_slice(&bytes)?;

    if body.port == 0 {
        return Err(DecodeError::InvalidPort("0".to_string()));
    }

    let transport = match body.net.as_deref() {
        Some("ws") => Transport::Ws {
            path: body.path,
            host: body.host,
        },
        // grpc carries its service name in the `path` field.
        Some("grpc") => Transport::Grpc {
            service_name: body.path,
        },
        _ => Transport::Tcp,
    };

    let tls = if body.tls.as_deref() == Some("tls") {
        TlsOptions {
            enabled: true,
            sni: body.sni,
            alpn: body
                .alpn
                .map(|a| {
                    a.split(',')
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    } else {
        TlsOptions::default()
    };

    Ok(ProxyDescriptor::Vmess {
        server: body.add,
        port: body.port,
        id: body.id,
        alter_id: body.aid.unwrap_or(0),
        cipher: body.scy.unwrap_or_else(|| "auto".to_string()),
        transport,
        tls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(s: &str) -> String {
        STANDARD.encode(s)
    }

    #[test]
    fn ss_with_plain_host_port() {
        let share = format!("ss://{}@1.2.3.4:8388#remark", b64("aes-256-gcm:pw1"));
        let desc = decode(&share).unwrap();
        assert_eq!(
            desc,
            ProxyDescriptor::Ss {
                server: "1.2.3.4".into(),
                port: 8388,
                cipher: "aes-256-gcm".into(),
                password: "pw1".into(),
            }
        );
    }

    #[test]
    fn ss_tolerates_missing_padding() {
        // 19 bytes of credentials, so the padded form ends in "==".
        let padded = b64("aes-256-gcm:sec:ret");
        assert!(padded.ends_with("=="));
        let payload = padded.replace('=', "");
        let desc = decode(&format!("ss://{payload}@host.example:443")).unwrap();
        match desc {
            ProxyDescriptor::Ss {
                cipher, password, ..
            } => {
                assert_eq!(cipher, "aes-256-gcm");
                // Password keeps everything after the first colon.
                assert_eq!(password, "sec:ret");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn ss_fully_base64_wrapped() {
        let share = format!("ss://{}", b64("aes-128-gcm:p@ss@9.9.9.9:8080"));
        let desc = decode(&share).unwrap();
        assert_eq!(
            desc,
            ProxyDescriptor::Ss {
                server: "9.9.9.9".into(),
                port: 8080,
                cipher: "aes-128-gcm".into(),
                // Split on the last '@': the password keeps the embedded one.
                password: "p@ss".into(),
            }
        );
    }

    #[test]
    fn ss_rejects_bad_port() {
        let share = format!("ss://{}@1.2.3.4:http", b64("aes-256-gcm:pw"));
        assert!(matches!(
            decode(&share),
            Err(DecodeError::InvalidPort(_))
        ));

        let share = format!("ss://{}@1.2.3.4:0", b64("aes-256-gcm:pw"));
        assert!(matches!(decode(&share), Err(DecodeError::InvalidPort(_))));

        let share = format!("ss://{}@1.2.3.4:70000", b64("aes-256-gcm:pw"));
        assert!(matches!(decode(&share), Err(DecodeError::InvalidPort(_))));
    }

    #[test]
    fn ss_rejects_garbage_base64() {
        assert!(decode("ss://!!!not-base64!!!@1.2.3.4:8388").is_err());
    }

    #[test]
    fn socks5_plain() {
        let desc = decode("socks5://5.6.7.8:1080").unwrap();
        assert_eq!(
            desc,
            ProxyDescriptor::Socks5 {
                server: "5.6.7.8".into(),
                port: 1080,
                username: None,
                password: None,
            }
        );
    }

    #[test]
    fn socks5_with_credentials_and_fragment() {
        let desc = decode("socks5://user:pa:ss@5.6.7.8:1080#home").unwrap();
        assert_eq!(
            desc,
            ProxyDescriptor::Socks5 {
                server: "5.6.7.8".into(),
                port: 1080,
                username: Some("user".into()),
                // Userinfo splits on the first colon only.
                password: Some("pa:ss".into()),
            }
        );
    }

    #[test]
    fn socks_alias_and_username_only() {
        let desc = decode("socks://admin@10.0.0.1:1080").unwrap();
        assert_eq!(
            desc,
            ProxyDescriptor::Socks5 {
                server: "10.0.0.1".into(),
                port: 1080,
                username: Some("admin".into()),
                password: None,
            }
        );
    }

    #[test]
    fn scheme_matching_is_case_insensitive() {
        assert!(decode("SS://YWVzLTI1Ni1nY206cHcx@1.2.3.4:8388").is_ok());
        assert!(decode("SOCKS5://5.6.7.8:1080").is_ok());
    }

    #[test]
    fn vmess_ws_tls() {
        let body = serde_json::json!({
            "v": "2",
            "ps": "existing remark",
            "add": "vm.example.com",
            "port": "443",
            "id": "b831381d-6324-4d53-ad4f-8cda48b30811",
            "aid": "2",
            "scy": "aes-128-gcm",
            "net": "ws",
            "path": "/tunnel",
            "host": "cdn.example.com",
            "tls": "tls",
            "sni": "vm.example.com",
            "alpn": "h2,http/1.1",
        });
        let share = format!("vmess://{}", b64(&body.to_string()));
        let desc = decode(&share).unwrap();
        assert_eq!(
            desc,
            ProxyDescriptor::Vmess {
                server: "vm.example.com".into(),
                port: 443,
                id: "b831381d-6324-4d53-ad4f-8cda48b30811".parse().unwrap(),
                alter_id: 2,
                cipher: "aes-128-gcm".into(),
                transport: Transport::Ws {
                    path: Some("/tunnel".into()),
                    host: Some("cdn.example.com".into()),
                },
                tls: TlsOptions {
                    enabled: true,
                    sni: Some("vm.example.com".into()),
                    alpn: vec!["h2".into(), "http/1.1".into()],
                },
            }
        );
    }

    #[test]
    fn vmess_grpc_takes_service_name_from_path() {
        let body = serde_json::json!({
            "add": "vm.example.com",
            "port": 443,
            "id": "b831381d-6324-4d53-ad4f-8cda48b30811",
            "net": "grpc",
            "path": "TunService",
        });
        let share = format!("vmess://{}", b64(&body.to_string()));
        match decode(&share).unwrap() {
            ProxyDescriptor::Vmess {
                transport, cipher, ..
            } => {
                assert_eq!(
                    transport,
                    Transport::Grpc {
                        service_name: Some("TunService".into())
                    }
                );
                assert_eq!(cipher, "auto");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn vmess_unknown_net_falls_back_to_tcp() {
        let body = serde_json::json!({
            "add": "vm.example.com",
            "port": 10086,
            "id": "b831381d-6324-4d53-ad4f-8cda48b30811",
            "net": "kcp",
            "tls": "",
        });
        let share = format!("vmess://{}", b64(&body.to_string()));
        match decode(&share).unwrap() {
            ProxyDescriptor::Vmess { transport, tls, .. } => {
                assert_eq!(transport, Transport::Tcp);
                assert!(!tls.enabled);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn vmess_rejects_malformed_json() {
        let share = format!("vmess://{}", b64("{not json"));
        assert!(matches!(decode(&share), Err(DecodeError::Json(_))));
    }

    #[test]
    fn opaque_schemes_are_unparseable() {
        for share in [
            "vless://uuid@host:443?security=reality#x",
            "trojan://password@host:443",
            "http://proxy.example.com:3128",
        ] {
            assert!(matches!(
                decode(share),
                Err(DecodeError::UnsupportedScheme(_))
            ));
        }
    }

    #[test]
    fn missing_scheme_is_malformed() {
        assert!(matches!(
            decode("not-a-link"),
            Err(DecodeError::Malformed(_))
        ));
    }
}
