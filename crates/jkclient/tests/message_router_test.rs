//
// message_router_test.rs
//
// Copyright (C) 2025 Posit Software, PBC. All rights reserved.
//
//

use jkclient::message_router::MessageRouter;
use jkshared::jupyter_message::JupyterChannel;

#[test]
fn test_resolves_registered_handlers() {
    let mut router: MessageRouter<u32> = MessageRouter::new(JupyterChannel::IOPub);
    router.register("stream", 1);
    router.register("status", 2);

    assert_eq!(router.channel(), JupyterChannel::IOPub);
    assert_eq!(router.resolve("stream"), Some(1));
    assert_eq!(router.resolve("status"), Some(2));
    assert!(router.unhandled().is_empty());
}

#[test]
fn test_remembers_misses() {
    let mut router: MessageRouter<u32> = MessageRouter::new(JupyterChannel::Shell);
    assert!(!router.is_resolved("debug_reply"));

    assert_eq!(router.resolve("debug_reply"), None);
    assert!(router.is_resolved("debug_reply"));
    assert_eq!(router.resolve("debug_reply"), None);
    assert_eq!(router.resolve("comm_info_reply"), None);

    assert_eq!(
        router.unhandled(),
        vec![String::from("comm_info_reply"), String::from("debug_reply")]
    );
}

#[test]
fn test_register_replaces_remembered_resolution() {
    let mut router: MessageRouter<u32> = MessageRouter::new(JupyterChannel::Stdin);
    assert_eq!(router.resolve("input_request"), None);

    router.register("input_request", 5);
    assert!(!router.is_resolved("input_request"));
    assert_eq!(router.resolve("input_request"), Some(5));

    router.register("input_request", 6);
    assert_eq!(router.resolve("input_request"), Some(6));
    assert!(router.unhandled().is_empty());
}
