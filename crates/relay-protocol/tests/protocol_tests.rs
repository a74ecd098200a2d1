//! Protocol layer tests — frame grammar, notification rendering, error taxonomy.

#[cfg(test)]
mod tests {
    use relay_protocol::*;
    use serde_json::json;

    fn id(name: &str) -> Identity {
        Identity::new(name).unwrap()
    }

    // ─────────────────────────────────────────────────────────────────────
    // ClientFrame
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn plain_text_is_broadcast() {
        let frame = ClientFrame::parse("hello everyone").unwrap();
        assert_eq!(frame, ClientFrame::Broadcast { body: "hello everyone".into() });
        assert!(!frame.is_private());
    }

    #[test]
    fn broadcast_body_is_verbatim() {
        let frame = ClientFrame::parse("  spaced out  ").unwrap();
        assert_eq!(frame, ClientFrame::Broadcast { body: "  spaced out  ".into() });
    }

    #[test]
    fn at_sign_not_at_start_is_broadcast() {
        let frame = ClientFrame::parse("mail me at bob@example.com").unwrap();
        assert!(!frame.is_private());
    }

    #[test]
    fn private_message_splits_on_first_space() {
        let frame = ClientFrame::parse("@alice hi there, how are you").unwrap();
        assert_eq!(
            frame,
            ClientFrame::Private {
                recipient: "alice".into(),
                body: "hi there, how are you".into(),
            }
        );
    }

    #[test]
    fn private_message_with_empty_body_is_allowed() {
        let frame = ClientFrame::parse("@alice ").unwrap();
        assert_eq!(
            frame,
            ClientFrame::Private { recipient: "alice".into(), body: String::new() }
        );
    }

    #[test]
    fn private_message_without_body_is_format_error() {
        assert_eq!(ClientFrame::parse("@alice"), Err(RelayError::InvalidPrivateFormat));
        assert_eq!(ClientFrame::parse("@"), Err(RelayError::InvalidPrivateFormat));
    }

    #[test]
    fn private_message_with_empty_recipient_parses() {
        // Routed like any unknown recipient.
        let frame = ClientFrame::parse("@ hi").unwrap();
        assert_eq!(frame, ClientFrame::Private { recipient: String::new(), body: "hi".into() });
    }

    // ─────────────────────────────────────────────────────────────────────
    // Notification — text rendering
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn text_rendering_matches_wire_tags() {
        let alice = id("alice");
        let bob = id("bob");

        assert_eq!(Notification::broadcast(&alice, "hello").to_text(), "[alice] hello");
        assert_eq!(Notification::private(&bob, "hi").to_text(), "[PRIVATE] bob: hi");
        assert_eq!(Notification::echo(&alice, "hi").to_text(), "[TO alice] hi");
        assert_eq!(
            Notification::joined(&alice).to_text(),
            "[SERVER] alice has joined the chat."
        );
        assert_eq!(
            Notification::left(&alice).to_text(),
            "[SERVER] alice has left the chat."
        );
    }

    #[test]
    fn error_rendering_uses_error_display() {
        let cases = [
            (RelayError::MissingIdentity, "[ERROR] No username provided."),
            (RelayError::DuplicateIdentity("carol".into()), "[ERROR] Username already taken."),
            (
                RelayError::InvalidPrivateFormat,
                "[ERROR] Invalid private message format. Use @username message.",
            ),
            (RelayError::RecipientNotFound("carol".into()), "[ERROR] User carol not found."),
        ];
        for (err, expected) in cases {
            assert_eq!(Notification::error(&err).to_text(), expected);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // WireFormat
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn json_envelope_is_tagged_by_kind() {
        let rendered = WireFormat::Json.render(&Notification::private(&id("bob"), "hi"));
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value, json!({"kind": "private", "from": "bob", "body": "hi"}));

        let rendered = WireFormat::Json.render(&Notification::echo(&id("alice"), "hi"));
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value, json!({"kind": "echo", "to": "alice", "body": "hi"}));
    }

    #[test]
    fn json_envelope_for_system_and_error() {
        let value: serde_json::Value =
            serde_json::from_str(&WireFormat::Json.render(&Notification::joined(&id("dave"))))
                .unwrap();
        assert_eq!(value["kind"], "system");
        assert_eq!(value["text"], "dave has joined the chat.");

        let err = Notification::error(&RelayError::MissingIdentity);
        let value: serde_json::Value =
            serde_json::from_str(&WireFormat::Json.render(&err)).unwrap();
        assert_eq!(value, json!({"kind": "error", "message": "No username provided."}));
    }

    #[test]
    fn json_envelope_rejects_empty_identity_on_decode() {
        let raw = json!({"kind": "broadcast", "from": "", "body": "x"});
        assert!(serde_json::from_value::<Notification>(raw).is_err());
    }

    #[test]
    fn wire_format_parses_case_insensitively() {
        assert_eq!("TEXT".parse::<WireFormat>().unwrap(), WireFormat::Text);
        assert_eq!("json".parse::<WireFormat>().unwrap(), WireFormat::Json);
        assert!("xml".parse::<WireFormat>().is_err());
        assert_eq!(WireFormat::default(), WireFormat::Text);
    }

    // ─────────────────────────────────────────────────────────────────────
    // RelayError
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn error_kinds() {
        assert_eq!(RelayError::MissingIdentity.kind(), ErrorKind::Admission);
        assert_eq!(RelayError::DuplicateIdentity("x".into()).kind(), ErrorKind::Admission);
        assert_eq!(RelayError::InvalidPrivateFormat.kind(), ErrorKind::ProtocolFormat);
        assert_eq!(RelayError::RecipientNotFound("x".into()).kind(), ErrorKind::Routing);
    }

    #[test]
    fn only_admission_errors_are_terminal() {
        assert!(!ErrorKind::Admission.is_recoverable());
        assert!(ErrorKind::ProtocolFormat.is_recoverable());
        assert!(ErrorKind::Routing.is_recoverable());
    }
}
