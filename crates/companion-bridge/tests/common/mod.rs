#![allow(dead_code)]

use std::collections::VecDeque;

use companion_bridge::{
    CompanionCommand, CompanionLink, CompanionReply, CompanionTransport, EditorBridge, Handshake,
    HandshakeRequest, NoBlockStack, TransportError,
};
use companion_codegen::{ProgramSnapshot, YailGenerator};

pub const PACKAGE: &str = "appinventor.ai_test.Hello";

/// Transport whose answers are scripted by the test.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    pub version: Option<&'static str>,
    pub package: Option<&'static str>,
    pub handshake_error: Option<TransportError>,
    pub transmit_error: Option<TransportError>,
    pub poll_error: Option<TransportError>,
    pub reset_error: Option<TransportError>,
    pub replies: VecDeque<Vec<CompanionReply>>,
    pub handshakes: Vec<HandshakeRequest>,
    pub sent: Vec<CompanionCommand>,
    pub polls: usize,
    pub resets: usize,
}

impl ScriptedTransport {
    pub fn with_version(version: &'static str) -> Self {
        Self {
            version: Some(version),
            ..Self::default()
        }
    }
}

impl CompanionTransport for ScriptedTransport {
    fn handshake(&mut self, request: &HandshakeRequest) -> Result<Handshake, TransportError> {
        self.handshakes.push(*request);
        if let Some(err) = self.handshake_error.clone() {
            return Err(err);
        }
        Ok(Handshake {
            version: self.version.map(Into::into),
            package: self.package.map(Into::into),
        })
    }

    fn transmit(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        if let Some(err) = self.transmit_error.clone() {
            return Err(err);
        }
        let command = CompanionCommand::decode(payload)
            .map_err(|err| TransportError::Protocol(err.to_string().into()))?;
        self.sent.push(command);
        Ok(())
    }

    fn poll(&mut self) -> Result<Vec<CompanionReply>, TransportError> {
        self.polls += 1;
        if let Some(err) = self.poll_error.clone() {
            return Err(err);
        }
        Ok(self.replies.pop_front().unwrap_or_default())
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        self.resets += 1;
        match self.reset_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub fn form_json(form: &str) -> String {
    format!(
        r#"{{"Properties":{{"$Name":"{form}","$Type":"Form","Uuid":"0","$Components":[
            {{"$Name":"Label1","$Type":"Label","Uuid":"1","Text":"hi"}}
        ]}}}}"#
    )
}

pub const BLOCKS: &str = r#"{"blocks":[
    {"id":"g","type":"global_declaration","fields":{"NAME":"greeting"},"inputs":{"VALUE":"t"}},
    {"id":"t","type":"text","fields":{"TEXT":"hello"}}
]}"#;

pub fn snapshot(form: &str, blocks: &str) -> ProgramSnapshot {
    ProgramSnapshot::new(form, form_json(form), blocks)
}

pub type TestBridge = EditorBridge<ScriptedTransport, NoBlockStack>;

pub fn bridge(transport: ScriptedTransport) -> TestBridge {
    EditorBridge::new(
        PACKAGE,
        "Screen1",
        YailGenerator::default(),
        CompanionLink::new(transport),
        NoBlockStack,
    )
}
