//! Common test utilities for building sockets, cards and wired canvases.
use std::cell::RefCell;
use std::rc::Rc;
use tsunagi::prelude::*;

/// Creates an input socket with a fixed id at the given position.
#[allow(dead_code)]
pub fn input(id: &str, index: usize) -> Socket {
    create_socket(SocketSpec::new(SocketType::Input, index).with_id(SocketId::new(id)))
}

/// Creates an output socket with a fixed id at the given position.
#[allow(dead_code)]
pub fn output(id: &str, index: usize) -> Socket {
    create_socket(SocketSpec::new(SocketType::Output, index).with_id(SocketId::new(id)))
}

/// Creates a densely indexed input array from a list of ids.
#[allow(dead_code)]
pub fn inputs(ids: &[&str]) -> Vec<Socket> {
    ids.iter()
        .enumerate()
        .map(|(index, id)| input(id, index))
        .collect()
}

#[allow(dead_code)]
pub fn ids(sockets: &[Socket]) -> Vec<&str> {
    sockets.iter().map(|s| s.id.as_str()).collect()
}

/// A card "target" with inputs `a`, `b`, `c` and no outputs.
#[allow(dead_code)]
pub fn abc_card() -> CardInstance {
    CardInstance::new(CardId::new("target"), SocketSet::new(inputs(&["a", "b", "c"]), vec![]))
}

/// A card "source" with a single output `out`.
#[allow(dead_code)]
pub fn source_card() -> CardInstance {
    CardInstance::new(CardId::new("source"), SocketSet::new(vec![], vec![output("out", 0)]))
}

/// Canvas with `source.out` wired into each of `target.a`, `target.b` and `target.c`.
#[allow(dead_code)]
pub fn wired_canvas() -> (Canvas, CardId, CardId) {
    wired_canvas_with(source_card(), abc_card())
}

/// Same wiring as [`wired_canvas`], with caller-supplied cards.
#[allow(dead_code)]
pub fn wired_canvas_with(source: CardInstance, target: CardInstance) -> (Canvas, CardId, CardId) {
    let source_id = source.id().clone();
    let target_id = target.id().clone();
    let mut canvas = Canvas::builder()
        .with_card(source)
        .with_card(target)
        .build()
        .expect("Failed to build canvas");

    for socket in ["a", "b", "c"] {
        canvas
            .connect(
                &source_id,
                &SocketId::new("out"),
                &target_id,
                &SocketId::new(socket),
            )
            .expect("Failed to connect sockets");
    }
    (canvas, source_id, target_id)
}

/// The input socket ids the canvas connections currently end at, in list order.
#[allow(dead_code)]
pub fn connected_inputs(canvas: &Canvas, card_id: &CardId) -> Vec<String> {
    canvas
        .connections()
        .iter()
        .filter(|c| &c.target_card_id == card_id)
        .map(|c| c.target_socket_id.to_string())
        .collect()
}

/// One change as seen by a [`Recorder`].
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub kind: ChangeKind,
    pub socket_type: SocketType,
    pub socket_id: SocketId,
    pub source: ChangeSource,
}

/// A change handler that logs every delivered change into a shared list.
#[allow(dead_code)]
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub log: Rc<RefCell<Vec<Recorded>>>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changes(&self) -> Vec<Recorded> {
        self.log.borrow().clone()
    }

    pub fn count(&self, kind: ChangeKind) -> usize {
        self.log.borrow().iter().filter(|r| r.kind == kind).count()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }

    fn record(&self, change: &SocketChange) {
        self.log.borrow_mut().push(Recorded {
            kind: change.kind,
            socket_type: change.socket_type,
            socket_id: change.socket_id.clone(),
            source: change.source,
        });
    }
}

impl SocketChangeHandler for Recorder {
    fn on_input_change(&mut self, change: &SocketChange, _ctx: &mut ChangeContext) -> CallbackResult {
        self.record(change);
        Ok(())
    }

    fn on_output_change(&mut self, change: &SocketChange, _ctx: &mut ChangeContext) -> CallbackResult {
        self.record(change);
        Ok(())
    }
}

/// A saved canvas with a null socket entry, a socket missing its index and name, and
/// one connection pointing at a socket that no longer exists.
#[allow(dead_code)]
pub const SAVED_CANVAS_JSON: &str = r#"{
    "cards": [
        {
            "id": "prompt",
            "sockets": {
                "inputs": [],
                "outputs": [{ "id": "out", "type": "output", "index": 0, "name": "Result", "momentUpdated": 10 }]
            },
            "payload": { "text": "Summarize {{topic}}" }
        },
        {
            "id": "agent",
            "sockets": {
                "inputs": [
                    { "id": "a", "type": "input", "index": 0, "name": "Context", "value": 1, "momentUpdated": 11 },
                    null,
                    { "id": "b" }
                ]
            }
        }
    ],
    "connections": [
        { "id": "c1", "sourceCardId": "prompt", "sourceSocketId": "out", "targetCardId": "agent", "targetSocketId": "b" },
        { "id": "c2", "sourceCardId": "prompt", "sourceSocketId": "out", "targetCardId": "agent", "targetSocketId": "gone" }
    ]
}"#;
