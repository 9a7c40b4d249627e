//! Log emission tests: category gating and the per-pass summary line.
//!
//! The category mask is process-global, so the enabled and disabled halves
//! run inside one test to keep them ordered.

use std::io;
use std::sync::{Arc, Mutex};

use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

use crossgc::logging::{set_log_categories, LogCategories};
use crossgc::testing::MockHost;
use crossgc::{
    CapabilityCache, Component, HostObjectGateway, ManagedId, ObjectNode, ReferenceControlBlock,
    Snapshot,
};

#[derive(Clone, Default)]
struct BufferWriter(Arc<Mutex<Vec<u8>>>);

impl BufferWriter {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for BufferWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Runs one single-object pass (plus an empty component) and returns the
/// captured log output.
fn captured_pass_output() -> String {
    let mut host = MockHost::new();
    host.initialize().unwrap();
    let peer = host.new_peer(host.conventional_class());
    host.retain(peer);

    let snapshot = Snapshot::new(
        vec![ObjectNode::new(
            ManagedId::new(1),
            ReferenceControlBlock::new_global(peer),
        )],
        vec![Component::new(vec![0]), Component::new(vec![])],
        vec![],
    );

    let writer = BufferWriter::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_writer(writer.clone())
        .with_ansi(false)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        crossgc::run_pass(&mut host, &mut CapabilityCache::new(), &snapshot);
    });

    writer.contents()
}

#[test]
fn test_category_mask_gates_transition_and_summary_events() {
    set_log_categories(LogCategories::ALL);
    let output = captured_pass_output();
    assert!(output.contains("demoted global reference to weak"));
    assert!(output.contains("promoted weak reference back to global"));
    assert!(output.contains("created temporary peer for empty component"));
    assert!(output.contains("pass summary"));

    set_log_categories(LogCategories::NONE);
    let output = captured_pass_output();
    assert!(!output.contains("demoted global reference to weak"));
    assert!(!output.contains("pass summary"));

    set_log_categories(LogCategories::BRIDGE);
    let output = captured_pass_output();
    assert!(!output.contains("demoted global reference to weak"));
    assert!(output.contains("pass summary"));
}
