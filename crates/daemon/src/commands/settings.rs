//! Engine settings commands: contact address, IPv6, encryption, NAT.

use voipd_engine_core::{FirewallPolicy, MediaEncryption};

use crate::core::DaemonCore;
use crate::protocol::Response;

use super::{single_token, Command, CommandRegistry};

pub fn register_commands(registry: &mut CommandRegistry) {
    registry.register(
        Command::new(
            "contact",
            "contact [<sip-address>]",
            "Show or set the primary contact address.",
            cmd_contact,
        )
        .example("contact sip:alice@work.example.org", "Status: Ok\n\nContact: sip:alice@work.example.org"),
    );
    registry.register(
        Command::new(
            "ipv6",
            "ipv6 [enable|disable|status]",
            "Show or set IPv6 support.",
            cmd_ipv6,
        )
        .example("ipv6 enable", "Status: Ok\n\nIpv6: enabled")
        .example("ipv6 status", "Status: Ok\n\nIpv6: enabled"),
    );
    registry.register(
        Command::new(
            "media-encryption",
            "media-encryption [none|srtp|zrtp|status]",
            "Show or set the media encryption policy.",
            cmd_media_encryption,
        )
        .example("media-encryption srtp", "Status: Ok\n\nMedia-encryption: srtp"),
    );
    registry.register(
        Command::new(
            "firewall-policy",
            "firewall-policy [none|nat <address>|stun <server>|status]",
            "Show or set the NAT traversal policy.",
            cmd_firewall_policy,
        )
        .example(
            "firewall-policy stun stun.example.org",
            "Status: Ok\n\nFirewall-policy: stun stun.example.org",
        ),
    );
}

fn cmd_contact(core: &mut DaemonCore, _registry: &CommandRegistry, args: &str) -> Response {
    let args = args.trim();
    if !args.is_empty() {
        let Some(uri) = single_token(args) else {
            return Response::error("Expected a single SIP address.");
        };
        if let Err(error) = core.engine_mut().set_primary_contact(uri) {
            return Response::error(format!("Could not set contact: {error}"));
        }
    }
    Response::ok().with_body(format!("Contact: {}", core.engine().primary_contact()))
}

fn cmd_ipv6(core: &mut DaemonCore, _registry: &CommandRegistry, args: &str) -> Response {
    match args.trim() {
        "" | "status" => {}
        "enable" => core.engine_mut().enable_ipv6(true),
        "disable" => core.engine_mut().enable_ipv6(false),
        _ => return Response::error("Expected: ipv6 [enable|disable|status]"),
    }
    let state = if core.engine().ipv6_enabled() {
        "enabled"
    } else {
        "disabled"
    };
    Response::ok().with_body(format!("Ipv6: {state}"))
}

fn cmd_media_encryption(core: &mut DaemonCore, _registry: &CommandRegistry, args: &str) -> Response {
    let encryption = match args.trim() {
        "" | "status" => None,
        "none" => Some(MediaEncryption::None),
        "srtp" => Some(MediaEncryption::Srtp),
        "zrtp" => Some(MediaEncryption::Zrtp),
        _ => return Response::error("Expected: media-encryption [none|srtp|zrtp|status]"),
    };
    if let Some(encryption) = encryption {
        if let Err(error) = core.engine_mut().set_media_encryption(encryption) {
            return Response::error(format!("Could not set media encryption: {error}"));
        }
    }
    Response::ok().with_body(format!(
        "Media-encryption: {}",
        core.engine().media_encryption()
    ))
}

fn cmd_firewall_policy(core: &mut DaemonCore, _registry: &CommandRegistry, args: &str) -> Response {
    let mut tokens = args.split_whitespace();
    let policy = match tokens.next() {
        None | Some("status") => None,
        Some("none") => Some(FirewallPolicy::None),
        Some("nat") => match tokens.next() {
            Some(address) => Some(FirewallPolicy::NatAddress(address.to_string())),
            None => return Response::error("Expected: firewall-policy nat <address>"),
        },
        Some("stun") => match tokens.next() {
            Some(server) => Some(FirewallPolicy::Stun(server.to_string())),
            None => return Response::error("Expected: firewall-policy stun <server>"),
        },
        Some(_) => {
            return Response::error("Expected: firewall-policy [none|nat <address>|stun <server>|status]")
        }
    };
    if tokens.next().is_some() {
        return Response::error("Expected: firewall-policy [none|nat <address>|stun <server>|status]");
    }
    if let Some(policy) = policy {
        core.engine_mut().set_firewall_policy(policy);
    }
    Response::ok().with_body(format!(
        "Firewall-policy: {}",
        core.engine().firewall_policy()
    ))
}

#[cfg(test)]
mod tests {
    use super::super::build_registry;
    use crate::core::DaemonCore;
    use crate::protocol::Status;
    use voipd_engine_core::{SoftEngine, SoftEngineConfig};

    fn core() -> DaemonCore {
        let (engine, _controller) = SoftEngine::new(SoftEngineConfig::default());
        DaemonCore::new(Box::new(engine))
    }

    #[test]
    fn contact_round_trips() {
        let registry = build_registry();
        let mut core = core();
        let set = registry.dispatch(&mut core, "contact sip:alice@work.example.org");
        assert_eq!(set.body(), Some("Contact: sip:alice@work.example.org"));
        let get = registry.dispatch(&mut core, "contact");
        assert_eq!(get.body(), Some("Contact: sip:alice@work.example.org"));
    }

    #[test]
    fn ipv6_toggles() {
        let registry = build_registry();
        let mut core = core();
        assert_eq!(
            registry.dispatch(&mut core, "ipv6").body(),
            Some("Ipv6: disabled")
        );
        assert_eq!(
            registry.dispatch(&mut core, "ipv6 enable").body(),
            Some("Ipv6: enabled")
        );
        assert_eq!(
            registry.dispatch(&mut core, "ipv6 nonsense").status(),
            Status::Error
        );
    }

    #[test]
    fn firewall_policy_requires_argument_for_stun() {
        let registry = build_registry();
        let mut core = core();
        let missing = registry.dispatch(&mut core, "firewall-policy stun");
        assert_eq!(missing.status(), Status::Error);
        let set = registry.dispatch(&mut core, "firewall-policy stun stun.example.org");
        assert_eq!(set.body(), Some("Firewall-policy: stun stun.example.org"));
    }

    #[test]
    fn media_encryption_set_and_status() {
        let registry = build_registry();
        let mut core = core();
        let set = registry.dispatch(&mut core, "media-encryption zrtp");
        assert_eq!(set.body(), Some("Media-encryption: zrtp"));
        let status = registry.dispatch(&mut core, "media-encryption status");
        assert_eq!(status.body(), Some("Media-encryption: zrtp"));
    }
}
