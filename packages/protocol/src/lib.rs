//! The binary mutation protocol shared between the weft runtime and its host
//! interpreters.
//!
//! The runtime's create and diff engines emit a stream of little-endian
//! opcodes into a host-provided buffer. The host interpreter maintains a
//! stack of freshly created nodes plus an id -> node map, and applies each
//! opcode in order until it reaches the [`End`](Opcode::End) sentinel.
//!
//! This crate is the only wire contract: the opcode byte values, the
//! length-prefix conventions (u32 for text payloads, u16 for attribute and
//! event names, u8 for template paths), and the action/event tag values that
//! cross the WASM boundary.

mod reader;
mod writer;

pub use reader::{read_mutations, DecodeError};
pub use writer::MutationWriter;

/// An element's unique identifier.
///
/// `ElementId` is a dense `u32` that is unique across the entire runtime -
/// but not unique across time. If a node is unmounted, its `ElementId` will
/// be reused for a new node. Id 0 is reserved for the root container the
/// host pre-registers.
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ElementId(pub u32);

/// The root container element the host pre-registers before applying any
/// mutation stream.
pub const ROOT_ID: ElementId = ElementId(0);

/// Wire opcodes, one byte each. The numeric values are the contract with the
/// host interpreter and must never be reordered.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    /// Terminates a mutation stream.
    End = 0x00,
    /// Pop m stack items and append them to the target element.
    AppendChildren = 0x01,
    /// Assign an id to the node at the given path under the topmost stack
    /// item.
    AssignId = 0x02,
    CreatePlaceholder = 0x03,
    CreateTextNode = 0x04,
    /// Clone root `index` of the registered template and push it.
    LoadTemplate = 0x05,
    /// Replace the target element with the topmost m stack items.
    ReplaceWith = 0x06,
    /// Replace the node at the given path under the topmost stack item with
    /// the m items above it.
    ReplacePlaceholder = 0x07,
    InsertAfter = 0x08,
    InsertBefore = 0x09,
    SetAttribute = 0x0A,
    SetText = 0x0B,
    NewEventListener = 0x0C,
    RemoveEventListener = 0x0D,
    Remove = 0x0E,
    /// Push an already-created node back onto the stack, for moves.
    PushRoot = 0x0F,
}

impl Opcode {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Opcode::End),
            0x01 => Some(Opcode::AppendChildren),
            0x02 => Some(Opcode::AssignId),
            0x03 => Some(Opcode::CreatePlaceholder),
            0x04 => Some(Opcode::CreateTextNode),
            0x05 => Some(Opcode::LoadTemplate),
            0x06 => Some(Opcode::ReplaceWith),
            0x07 => Some(Opcode::ReplacePlaceholder),
            0x08 => Some(Opcode::InsertAfter),
            0x09 => Some(Opcode::InsertBefore),
            0x0A => Some(Opcode::SetAttribute),
            0x0B => Some(Opcode::SetText),
            0x0C => Some(Opcode::NewEventListener),
            0x0D => Some(Opcode::RemoveEventListener),
            0x0E => Some(Opcode::Remove),
            0x0F => Some(Opcode::PushRoot),
            _ => None,
        }
    }
}

/// A `Mutation` represents a single decoded instruction for the host to use
/// to modify the UI tree to match the state of the runtime.
///
/// The writer emits these directly as bytes; this owned form exists so that
/// hosts (and tests) can decode, inspect, and serialize a stream.
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Add the topmost m stack items as children of the target element.
    AppendChildren { id: ElementId, m: u32 },

    /// Assign the node at `path` under the topmost stack item the given id.
    ///
    /// A path of `[]` is the topmost node itself; `[0, 1]` is the first
    /// child's second child. Template elements cannot have more than 255
    /// children, hence one byte per step.
    AssignId { path: Vec<u8>, id: ElementId },

    /// Create a placeholder node that will be replaced or anchored against
    /// later.
    CreatePlaceholder { id: ElementId },

    CreateTextNode { id: ElementId, text: String },

    /// Clone root `index` of template `template` and push it onto the stack
    /// under the given id.
    LoadTemplate { template: u32, index: u32, id: ElementId },

    /// Replace the target element with the topmost m stack items.
    ReplaceWith { id: ElementId, m: u32 },

    /// Replace the node at `path` under the topmost stack item with the m
    /// items above it.
    ReplacePlaceholder { path: Vec<u8>, m: u32 },

    InsertAfter { id: ElementId, m: u32 },

    InsertBefore { id: ElementId, m: u32 },

    /// Set an attribute. An empty value is interpreted by the host as
    /// attribute removal; ns 0 is the null namespace.
    SetAttribute { id: ElementId, ns: u8, name: String, value: String },

    SetText { id: ElementId, text: String },

    NewEventListener { id: ElementId, name: String },

    RemoveEventListener { id: ElementId, name: String },

    Remove { id: ElementId },

    PushRoot { id: ElementId },
}

/// Handler action tags. These values cross the WASM boundary whenever the
/// host echoes an action back, so they are part of the wire contract.
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    None = 0,
    SetI32 = 1,
    AddI32 = 2,
    SubI32 = 3,
    Toggle = 4,
    SetInput = 5,
    SetString = 6,
    KeyEnterCustom = 7,
    Custom = 255,
}

impl Action {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Action::None),
            1 => Some(Action::SetI32),
            2 => Some(Action::AddI32),
            3 => Some(Action::SubI32),
            4 => Some(Action::Toggle),
            5 => Some(Action::SetInput),
            6 => Some(Action::SetString),
            7 => Some(Action::KeyEnterCustom),
            255 => Some(Action::Custom),
            _ => None,
        }
    }
}

/// Event type tags used when the host forwards an input event into the
/// runtime.
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    Click = 0,
    Input = 1,
    KeyDown = 2,
    KeyUp = 3,
    MouseMove = 4,
    Focus = 5,
    Blur = 6,
    Submit = 7,
    Change = 8,
    MouseDown = 9,
    MouseUp = 10,
    MouseEnter = 11,
    MouseLeave = 12,
    Custom = 255,
}

impl EventKind {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(EventKind::Click),
            1 => Some(EventKind::Input),
            2 => Some(EventKind::KeyDown),
            3 => Some(EventKind::KeyUp),
            4 => Some(EventKind::MouseMove),
            5 => Some(EventKind::Focus),
            6 => Some(EventKind::Blur),
            7 => Some(EventKind::Submit),
            8 => Some(EventKind::Change),
            9 => Some(EventKind::MouseDown),
            10 => Some(EventKind::MouseUp),
            11 => Some(EventKind::MouseEnter),
            12 => Some(EventKind::MouseLeave),
            255 => Some(EventKind::Custom),
            _ => None,
        }
    }
}
