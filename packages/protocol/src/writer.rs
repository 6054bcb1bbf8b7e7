use crate::{ElementId, Mutation, Opcode};

/// Appends little-endian opcodes into a caller-provided buffer.
///
/// The buffer is owned by the host for the duration of one `rebuild` or
/// `flush` call; the writer only tracks the append offset. Overflowing the
/// buffer is fatal - the host must size it for the largest plausible patch.
///
/// Strings are length-prefixed: u32 for text payloads, u16 for attribute and
/// event names. Paths carry a u8 length. All element ids are u32.
pub struct MutationWriter<'buf> {
    buf: &'buf mut [u8],
    at: usize,
}

impl<'buf> MutationWriter<'buf> {
    pub fn new(buf: &'buf mut [u8]) -> Self {
        Self { buf, at: 0 }
    }

    /// Bytes written so far, excluding the End sentinel.
    pub fn len(&self) -> usize {
        self.at
    }

    /// True when no opcode has been written yet.
    pub fn is_empty(&self) -> bool {
        self.at == 0
    }

    /// Append the End sentinel and return the total written length.
    pub fn finalize(mut self) -> usize {
        self.put_u8(Opcode::End as u8);
        self.at
    }

    pub fn append_children(&mut self, id: ElementId, m: u32) {
        self.put_u8(Opcode::AppendChildren as u8);
        self.put_u32(id.0);
        self.put_u32(m);
    }

    pub fn assign_id(&mut self, path: &[u8], id: ElementId) {
        self.put_u8(Opcode::AssignId as u8);
        self.put_path(path);
        self.put_u32(id.0);
    }

    pub fn create_placeholder(&mut self, id: ElementId) {
        self.put_u8(Opcode::CreatePlaceholder as u8);
        self.put_u32(id.0);
    }

    pub fn create_text_node(&mut self, id: ElementId, text: &str) {
        self.put_u8(Opcode::CreateTextNode as u8);
        self.put_u32(id.0);
        self.put_text(text);
    }

    pub fn load_template(&mut self, template: u32, index: u32, id: ElementId) {
        self.put_u8(Opcode::LoadTemplate as u8);
        self.put_u32(template);
        self.put_u32(index);
        self.put_u32(id.0);
    }

    pub fn replace_with(&mut self, id: ElementId, m: u32) {
        self.put_u8(Opcode::ReplaceWith as u8);
        self.put_u32(id.0);
        self.put_u32(m);
    }

    pub fn replace_placeholder(&mut self, path: &[u8], m: u32) {
        self.put_u8(Opcode::ReplacePlaceholder as u8);
        self.put_path(path);
        self.put_u32(m);
    }

    pub fn insert_after(&mut self, id: ElementId, m: u32) {
        self.put_u8(Opcode::InsertAfter as u8);
        self.put_u32(id.0);
        self.put_u32(m);
    }

    pub fn insert_before(&mut self, id: ElementId, m: u32) {
        self.put_u8(Opcode::InsertBefore as u8);
        self.put_u32(id.0);
        self.put_u32(m);
    }

    pub fn set_attribute(&mut self, id: ElementId, ns: u8, name: &str, value: &str) {
        self.put_u8(Opcode::SetAttribute as u8);
        self.put_u32(id.0);
        self.put_u8(ns);
        self.put_name(name);
        self.put_text(value);
    }

    pub fn set_text(&mut self, id: ElementId, text: &str) {
        self.put_u8(Opcode::SetText as u8);
        self.put_u32(id.0);
        self.put_text(text);
    }

    pub fn new_event_listener(&mut self, id: ElementId, name: &str) {
        self.put_u8(Opcode::NewEventListener as u8);
        self.put_u32(id.0);
        self.put_name(name);
    }

    pub fn remove_event_listener(&mut self, id: ElementId, name: &str) {
        self.put_u8(Opcode::RemoveEventListener as u8);
        self.put_u32(id.0);
        self.put_name(name);
    }

    pub fn remove(&mut self, id: ElementId) {
        self.put_u8(Opcode::Remove as u8);
        self.put_u32(id.0);
    }

    pub fn push_root(&mut self, id: ElementId) {
        self.put_u8(Opcode::PushRoot as u8);
        self.put_u32(id.0);
    }

    /// Encode an already-decoded mutation. Mostly useful for round-trip
    /// testing and for hosts that relay streams.
    pub fn write(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::AppendChildren { id, m } => self.append_children(*id, *m),
            Mutation::AssignId { path, id } => self.assign_id(path, *id),
            Mutation::CreatePlaceholder { id } => self.create_placeholder(*id),
            Mutation::CreateTextNode { id, text } => self.create_text_node(*id, text),
            Mutation::LoadTemplate { template, index, id } => {
                self.load_template(*template, *index, *id)
            }
            Mutation::ReplaceWith { id, m } => self.replace_with(*id, *m),
            Mutation::ReplacePlaceholder { path, m } => self.replace_placeholder(path, *m),
            Mutation::InsertAfter { id, m } => self.insert_after(*id, *m),
            Mutation::InsertBefore { id, m } => self.insert_before(*id, *m),
            Mutation::SetAttribute { id, ns, name, value } => {
                self.set_attribute(*id, *ns, name, value)
            }
            Mutation::SetText { id, text } => self.set_text(*id, text),
            Mutation::NewEventListener { id, name } => self.new_event_listener(*id, name),
            Mutation::RemoveEventListener { id, name } => self.remove_event_listener(*id, name),
            Mutation::Remove { id } => self.remove(*id),
            Mutation::PushRoot { id } => self.push_root(*id),
        }
    }

    fn reserve(&mut self, n: usize) {
        assert!(
            self.at + n <= self.buf.len(),
            "mutation buffer overflow: {} bytes written, {} more needed, capacity {}",
            self.at,
            n,
            self.buf.len()
        );
    }

    fn put_u8(&mut self, byte: u8) {
        self.reserve(1);
        self.buf[self.at] = byte;
        self.at += 1;
    }

    fn put_u32(&mut self, value: u32) {
        self.reserve(4);
        self.buf[self.at..self.at + 4].copy_from_slice(&value.to_le_bytes());
        self.at += 4;
    }

    fn put_u16(&mut self, value: u16) {
        self.reserve(2);
        self.buf[self.at..self.at + 2].copy_from_slice(&value.to_le_bytes());
        self.at += 2;
    }

    fn put_bytes(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len());
        self.buf[self.at..self.at + bytes.len()].copy_from_slice(bytes);
        self.at += bytes.len();
    }

    fn put_text(&mut self, text: &str) {
        self.put_u32(text.len() as u32);
        self.put_bytes(text.as_bytes());
    }

    fn put_name(&mut self, name: &str) {
        debug_assert!(name.len() <= u16::MAX as usize);
        self.put_u16(name.len() as u16);
        self.put_bytes(name.as_bytes());
    }

    fn put_path(&mut self, path: &[u8]) {
        debug_assert!(path.len() <= u8::MAX as usize);
        self.put_u8(path.len() as u8);
        self.put_bytes(path);
    }
}
