mod common;

use common::ScriptedTransport;
use companion_bridge::{
    BridgeConfig, CompanionLink, CompanionReply, LinkError, SessionState, StartRequest,
    TransportError, TransportKind,
};
use companion_codegen::{CodeGenerator, ProgramSnapshot, YailGenerator};

fn program() -> companion_codegen::GeneratedProgram {
    let snapshot = ProgramSnapshot::new("Screen1", common::form_json("Screen1"), common::BLOCKS);
    YailGenerator::default()
        .generate(&snapshot, common::PACKAGE)
        .unwrap()
}

#[test]
fn start_picks_transport_from_flags() {
    let mut link = CompanionLink::new(ScriptedTransport::with_version("2.70"));
    let state = link
        .start(StartRequest {
            already_running: true,
            for_emulator: true,
            for_usb: true,
        })
        .unwrap();
    assert_eq!(state, SessionState::Connected);
    assert_eq!(link.session().transport_kind(), Some(TransportKind::Usb));
    assert_eq!(link.session().companion_version(), Some("2.70"));
    let handshake = link.transport().handshakes[0];
    assert_eq!(handshake.kind, TransportKind::Usb);
    assert!(handshake.already_running);
}

#[test]
fn handshake_failure_allows_retry() {
    let mut link = CompanionLink::new(ScriptedTransport {
        handshake_error: Some(TransportError::Timeout),
        ..ScriptedTransport::with_version("2.70")
    });
    assert!(matches!(
        link.start(StartRequest::default()),
        Err(LinkError::TransportFailure { .. })
    ));
    assert_eq!(link.state(), SessionState::Idle);

    link.transport_mut().handshake_error = None;
    assert_eq!(
        link.start(StartRequest::default()),
        Ok(SessionState::Connected)
    );
}

#[test]
fn poll_failures_leave_session_connected() {
    let mut link = CompanionLink::new(ScriptedTransport {
        poll_error: Some(TransportError::LinkLost),
        ..ScriptedTransport::with_version("2.70")
    });
    link.start(StartRequest::default()).unwrap();
    for _ in 0..3 {
        assert!(link.poll().is_empty());
        assert_eq!(link.state(), SessionState::Connected);
    }
    assert_eq!(link.transport().polls, 3);

    link.transport_mut().poll_error = None;
    link.transport_mut()
        .replies
        .push_back(vec![CompanionReply::ok("done")]);
    assert_eq!(link.poll(), vec![CompanionReply::ok("done")]);
}

#[test]
fn poll_outside_connected_does_not_touch_transport() {
    let mut link = CompanionLink::new(ScriptedTransport::default());
    assert!(link.poll().is_empty());
    assert_eq!(link.transport().polls, 0);
    assert_eq!(link.state(), SessionState::Idle);
}

#[test]
fn allow_lists_only_grow() {
    let mut link = CompanionLink::new(ScriptedTransport::default());
    assert!(!link.is_companion_acceptable("2.70"));
    assert!(link.add_acceptable_companion("2.70"));
    assert!(!link.add_acceptable_companion("2.70"));
    assert!(link.add_acceptable_package("edu.mit.appinventor.aicompanion3"));
    assert!(link.is_companion_acceptable("2.70"));
    assert!(link.is_companion_acceptable("edu.mit.appinventor.aicompanion3"));
    assert!(!link.is_companion_acceptable("2.69"));

    link.start(StartRequest::default()).unwrap();
    link.hard_reset().unwrap();
    assert!(link.is_companion_acceptable("2.70"));
}

#[test]
fn unlisted_companion_cannot_receive_programs() {
    let mut link = CompanionLink::new(ScriptedTransport::with_version("2.60"));
    link.add_acceptable_companion("2.70");
    link.start(StartRequest::default()).unwrap();
    assert!(!link.session().is_compatible());
    assert_eq!(
        link.send_generated_program(&program()),
        Err(LinkError::IncompatibleCompanion {
            version: "2.60".into()
        })
    );
    assert!(link.transport().sent.is_empty());
}

#[test]
fn listed_package_is_enough() {
    let mut link = CompanionLink::new(ScriptedTransport {
        package: Some("edu.mit.appinventor.aicompanion3"),
        ..ScriptedTransport::with_version("2.60")
    });
    link.add_acceptable_package("edu.mit.appinventor.aicompanion3");
    link.start(StartRequest::default()).unwrap();
    assert!(link.session().is_compatible());
    link.send_generated_program(&program()).unwrap();
    assert_eq!(link.transport().sent.len(), 1);
}

#[test]
fn lost_transport_is_terminal_until_start() {
    let mut link = CompanionLink::new(ScriptedTransport::with_version("2.70"));
    link.start(StartRequest::default()).unwrap();
    assert_eq!(link.mark_disconnected(), SessionState::Disconnected);
    assert!(matches!(
        link.send_generated_program(&program()),
        Err(LinkError::NotConnected {
            state: SessionState::Disconnected
        })
    ));
    assert!(matches!(
        link.hard_reset(),
        Err(LinkError::NotConnected { .. })
    ));
    assert_eq!(
        link.start(StartRequest::default()),
        Ok(SessionState::Connected)
    );
}

#[test]
fn config_seeds_link() {
    let config = BridgeConfig::from_toml_str(
        r#"
[project]
package = "appinventor.ai_test.Hello"

[companion]
preferred = "2.70"
update_url = "https://example.org/companion.apk"
acceptable_packages = ["edu.mit.appinventor.aicompanion3"]
acceptable_companions = ["2.69", "2.70", "2.70"]

[transport]
endpoint = "unix:///tmp/companion.sock"
kind = "usb"
poll_interval_ms = 250
"#,
    )
    .unwrap();
    assert_eq!(config.transport.kind, TransportKind::Usb);

    let mut link = CompanionLink::new(ScriptedTransport::default());
    config.apply_to_link(&mut link);
    assert!(link.is_companion_acceptable("2.69"));
    assert!(link.is_companion_acceptable("edu.mit.appinventor.aicompanion3"));
    assert_eq!(link.preferred_companion(), Some("2.70"));
    assert_eq!(link.update_url(), Some("https://example.org/companion.apk"));
}
