//! Registration commands: proxies, registration status, credentials.

use voipd_engine_core::{AuthInfo, ProxyConfig, ProxyId};

use crate::core::{DaemonCore, NO_AUTH_INFO, NO_PROXY};
use crate::protocol::Response;

use super::{parse_handle, single_token, Command, CommandRegistry};

pub fn register_commands(registry: &mut CommandRegistry) {
    registry.register(
        Command::new(
            "register",
            "register <identity> <proxy-address> [<password>] [<realm>]",
            "Register an identity on a proxy; credentials are stored if given.",
            cmd_register,
        )
        .example(
            "register sip:alice@example.org sip:proxy.example.org secret",
            "Status: Ok\n\nId: 1",
        ),
    );
    registry.register(
        Command::new(
            "unregister",
            "unregister <proxy-id>|ALL",
            "Unregister and remove one proxy, or all of them.",
            cmd_unregister,
        )
        .example("unregister 1", "Status: Ok"),
    );
    registry.register(
        Command::new(
            "register-status",
            "register-status [<proxy-id>|ALL]",
            "Show the registration state of one proxy or of all proxies.",
            cmd_register_status,
        )
        .example("register-status 1", "Status: Ok\n\nId: 1 | State: Ok"),
    );
    registry.register(
        Command::new(
            "auth-infos-clear",
            "auth-infos-clear [<auth-info-index>|ALL]",
            "Remove one stored credential (1-based index) or all of them.",
            cmd_auth_infos_clear,
        )
        .example("auth-infos-clear ALL", "Status: Ok"),
    );
}

/// Username part of a SIP identity ("sip:alice@example.org" -> "alice").
fn username_of(identity: &str) -> &str {
    let after_scheme = identity
        .strip_prefix("sips:")
        .or_else(|| identity.strip_prefix("sip:"))
        .unwrap_or(identity);
    after_scheme.split('@').next().unwrap_or(after_scheme)
}

fn cmd_register(core: &mut DaemonCore, _registry: &CommandRegistry, args: &str) -> Response {
    let mut tokens = args.split_whitespace();
    let (Some(identity), Some(proxy)) = (tokens.next(), tokens.next()) else {
        return Response::error("Expected: register <identity> <proxy-address> [<password>] [<realm>]");
    };
    let password = tokens.next();
    let realm = tokens.next().unwrap_or("");
    if tokens.next().is_some() {
        return Response::error("Expected: register <identity> <proxy-address> [<password>] [<realm>]");
    }
    if let Some(password) = password {
        core.engine_mut().add_auth_info(AuthInfo {
            username: username_of(identity).to_string(),
            realm: realm.to_string(),
            password: Some(password.to_string()),
        });
    }
    let config = ProxyConfig {
        server_uri: proxy.to_string(),
        identity: identity.to_string(),
        register: true,
    };
    match core.engine_mut().add_proxy(config) {
        Ok(id) => {
            let handle = core.handle_for_proxy(id);
            Response::ok().with_body(format!("Id: {handle}"))
        }
        Err(error) => Response::error(format!("Could not register: {error}")),
    }
}

fn cmd_unregister(core: &mut DaemonCore, _registry: &CommandRegistry, args: &str) -> Response {
    let Some(token) = single_token(args) else {
        return Response::error("Expected: unregister <proxy-id>|ALL");
    };
    if token.eq_ignore_ascii_case("all") {
        let ids: Vec<ProxyId> = core.engine().proxies();
        for id in ids {
            let _ = core.engine_mut().remove_proxy(id);
        }
        return Response::ok();
    }
    let Some(handle) = parse_handle(token) else {
        return Response::error("Expected a proxy id.");
    };
    let Some(id) = core.find_proxy(handle) else {
        return Response::error(NO_PROXY);
    };
    match core.engine_mut().remove_proxy(id) {
        Ok(()) => Response::ok(),
        Err(error) => Response::error(format!("Could not unregister: {error}")),
    }
}

fn cmd_register_status(core: &mut DaemonCore, _registry: &CommandRegistry, args: &str) -> Response {
    let args = args.trim();
    if args.is_empty() || args.eq_ignore_ascii_case("all") {
        let ids = core.engine().proxies();
        let mut body = format!("Proxy-count: {}", ids.len());
        for id in ids {
            let handle = core.handle_for_proxy(id);
            if let Some(info) = core.engine().proxy_info(id) {
                body.push_str(&format!("\nId: {handle} | State: {}", info.state));
            }
        }
        return Response::ok().with_body(body);
    }
    let Some(handle) = single_token(args).and_then(parse_handle) else {
        return Response::error("Expected a proxy id.");
    };
    let Some(id) = core.find_proxy(handle) else {
        return Response::error(NO_PROXY);
    };
    match core.engine().proxy_info(id) {
        Some(info) => Response::ok().with_body(format!("Id: {handle} | State: {}", info.state)),
        None => Response::error(NO_PROXY),
    }
}

fn cmd_auth_infos_clear(core: &mut DaemonCore, _registry: &CommandRegistry, args: &str) -> Response {
    let args = args.trim();
    if args.is_empty() || args.eq_ignore_ascii_case("all") {
        core.engine_mut().clear_all_auth_info();
        return Response::ok();
    }
    let Some(ordinal) = single_token(args).and_then(|t| t.parse::<usize>().ok()) else {
        return Response::error("Expected an auth info index.");
    };
    if core.find_auth_info(ordinal).is_none() {
        return Response::error(NO_AUTH_INFO);
    }
    match core.engine_mut().clear_auth_info(ordinal - 1) {
        Ok(()) => Response::ok(),
        Err(error) => Response::error(format!("Could not clear auth info: {error}")),
    }
}

#[cfg(test)]
mod tests {
    use super::super::build_registry;
    use super::username_of;
    use crate::core::DaemonCore;
    use crate::protocol::Status;
    use voipd_engine_core::{SoftEngine, SoftEngineConfig};

    fn core() -> DaemonCore {
        let (engine, _controller) = SoftEngine::new(SoftEngineConfig::default());
        DaemonCore::new(Box::new(engine))
    }

    #[test]
    fn username_extraction() {
        assert_eq!(username_of("sip:alice@example.org"), "alice");
        assert_eq!(username_of("bob@example.org"), "bob");
        assert_eq!(username_of("carol"), "carol");
    }

    #[test]
    fn register_creates_proxy_and_auth_info() {
        let registry = build_registry();
        let mut core = core();
        let response = registry.dispatch(
            &mut core,
            "register sip:alice@example.org sip:proxy.example.org secret example.org",
        );
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.body(), Some("Id: 1"));
        let auth = core.find_auth_info(1).unwrap();
        assert_eq!(auth.username, "alice");
        assert_eq!(auth.realm, "example.org");
    }

    #[test]
    fn registration_status_progresses_to_ok() {
        let registry = build_registry();
        let mut core = core();
        registry.dispatch(&mut core, "register sip:alice@example.org sip:proxy.example.org");
        let before = registry.dispatch(&mut core, "register-status 1");
        assert!(before.body().unwrap().contains("State: Progress"));
        core.tick();
        let after = registry.dispatch(&mut core, "register-status 1");
        assert!(after.body().unwrap().contains("State: Ok"));
    }

    #[test]
    fn unregister_unknown_proxy_fails() {
        let registry = build_registry();
        let mut core = core();
        let response = registry.dispatch(&mut core, "unregister 7");
        assert_eq!(response.status(), Status::Error);
        assert_eq!(response.reason(), Some("No proxy with such id."));
    }

    #[test]
    fn auth_infos_clear_by_index_and_all() {
        let registry = build_registry();
        let mut core = core();
        registry.dispatch(&mut core, "register sip:a@x.org sip:p.x.org pw1");
        registry.dispatch(&mut core, "register sip:b@x.org sip:p.x.org pw2");
        assert!(core.find_auth_info(2).is_some());

        let response = registry.dispatch(&mut core, "auth-infos-clear 1");
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(core.find_auth_info(1).unwrap().username, "b");

        let missing = registry.dispatch(&mut core, "auth-infos-clear 5");
        assert_eq!(missing.reason(), Some("No auth info with such index."));

        registry.dispatch(&mut core, "auth-infos-clear ALL");
        assert!(core.find_auth_info(1).is_none());
    }
}
