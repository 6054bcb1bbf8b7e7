use crate::{ElementId, Mutation, Opcode};

/// Failures while decoding a mutation stream.
///
/// A well-formed stream always terminates with the End sentinel, so a reader
/// running off the end of the buffer indicates a truncated or corrupt
/// payload rather than a short read.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("mutation stream is truncated at byte {at}")]
    Truncated { at: usize },

    #[error("unknown opcode {opcode:#04x} at byte {at}")]
    UnknownOpcode { opcode: u8, at: usize },

    #[error("string payload at byte {at} is not valid utf-8")]
    InvalidUtf8 { at: usize },
}

/// Decode a mutation stream up to (and excluding) the End sentinel.
///
/// This is the host-side half of the protocol; the runtime itself only ever
/// writes. Tests round-trip through it to assert on exact opcode sequences.
pub fn read_mutations(buf: &[u8]) -> Result<Vec<Mutation>, DecodeError> {
    let mut reader = Reader { buf, at: 0 };
    let mut mutations = Vec::new();

    loop {
        let at = reader.at;
        let byte = reader.u8()?;
        let opcode = Opcode::from_u8(byte).ok_or(DecodeError::UnknownOpcode { opcode: byte, at })?;

        let mutation = match opcode {
            Opcode::End => return Ok(mutations),
            Opcode::AppendChildren => Mutation::AppendChildren {
                id: reader.id()?,
                m: reader.u32()?,
            },
            Opcode::AssignId => Mutation::AssignId {
                path: reader.path()?,
                id: reader.id()?,
            },
            Opcode::CreatePlaceholder => Mutation::CreatePlaceholder { id: reader.id()? },
            Opcode::CreateTextNode => Mutation::CreateTextNode {
                id: reader.id()?,
                text: reader.text()?,
            },
            Opcode::LoadTemplate => Mutation::LoadTemplate {
                template: reader.u32()?,
                index: reader.u32()?,
                id: reader.id()?,
            },
            Opcode::ReplaceWith => Mutation::ReplaceWith {
                id: reader.id()?,
                m: reader.u32()?,
            },
            Opcode::ReplacePlaceholder => Mutation::ReplacePlaceholder {
                path: reader.path()?,
                m: reader.u32()?,
            },
            Opcode::InsertAfter => Mutation::InsertAfter {
                id: reader.id()?,
                m: reader.u32()?,
            },
            Opcode::InsertBefore => Mutation::InsertBefore {
                id: reader.id()?,
                m: reader.u32()?,
            },
            Opcode::SetAttribute => Mutation::SetAttribute {
                id: reader.id()?,
                ns: reader.u8()?,
                name: reader.name()?,
                value: reader.text()?,
            },
            Opcode::SetText => Mutation::SetText {
                id: reader.id()?,
                text: reader.text()?,
            },
            Opcode::NewEventListener => Mutation::NewEventListener {
                id: reader.id()?,
                name: reader.name()?,
            },
            Opcode::RemoveEventListener => Mutation::RemoveEventListener {
                id: reader.id()?,
                name: reader.name()?,
            },
            Opcode::Remove => Mutation::Remove { id: reader.id()? },
            Opcode::PushRoot => Mutation::PushRoot { id: reader.id()? },
        };

        mutations.push(mutation);
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    at: usize,
}

impl<'a> Reader<'a> {
    fn u8(&mut self) -> Result<u8, DecodeError> {
        let byte = *self
            .buf
            .get(self.at)
            .ok_or(DecodeError::Truncated { at: self.at })?;
        self.at += 1;
        Ok(byte)
    }

    fn u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn id(&mut self) -> Result<ElementId, DecodeError> {
        Ok(ElementId(self.u32()?))
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.at + n;
        let bytes = self
            .buf
            .get(self.at..end)
            .ok_or(DecodeError::Truncated { at: self.at })?;
        self.at = end;
        Ok(bytes)
    }

    fn text(&mut self) -> Result<String, DecodeError> {
        let len = self.u32()? as usize;
        let at = self.at;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidUtf8 { at })
    }

    fn name(&mut self) -> Result<String, DecodeError> {
        let len = self.u16()? as usize;
        let at = self.at;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidUtf8 { at })
    }

    fn path(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = self.u8()? as usize;
        Ok(self.take(len)?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MutationWriter;

    fn roundtrip(ops: &[Mutation]) {
        let mut buf = vec![0u8; 4096];
        let mut writer = MutationWriter::new(&mut buf);
        for op in ops {
            writer.write(op);
        }
        let len = writer.finalize();
        assert_eq!(read_mutations(&buf[..len]).unwrap(), ops);
    }

    #[test]
    fn every_opcode_roundtrips() {
        roundtrip(&[
            Mutation::LoadTemplate { template: 3, index: 0, id: ElementId(1) },
            Mutation::AssignId { path: vec![0, 0], id: ElementId(2) },
            Mutation::CreatePlaceholder { id: ElementId(3) },
            Mutation::CreateTextNode { id: ElementId(4), text: "hello".into() },
            Mutation::ReplacePlaceholder { path: vec![1], m: 1 },
            Mutation::ReplaceWith { id: ElementId(4), m: 2 },
            Mutation::InsertAfter { id: ElementId(5), m: 1 },
            Mutation::InsertBefore { id: ElementId(6), m: 1 },
            Mutation::SetAttribute {
                id: ElementId(2),
                ns: 0,
                name: "class".into(),
                value: "active".into(),
            },
            Mutation::SetText { id: ElementId(4), text: "bye".into() },
            Mutation::NewEventListener { id: ElementId(2), name: "click".into() },
            Mutation::RemoveEventListener { id: ElementId(2), name: "click".into() },
            Mutation::Remove { id: ElementId(6) },
            Mutation::PushRoot { id: ElementId(1) },
            Mutation::AppendChildren { id: ElementId(0), m: 1 },
        ]);
    }

    #[test]
    fn empty_payloads_roundtrip() {
        roundtrip(&[
            Mutation::CreateTextNode { id: ElementId(1), text: String::new() },
            Mutation::AssignId { path: vec![], id: ElementId(2) },
            Mutation::SetAttribute {
                id: ElementId(2),
                ns: 0,
                name: "class".into(),
                value: String::new(),
            },
        ]);
    }

    #[test]
    fn truncated_stream_is_rejected() {
        let mut buf = vec![0u8; 64];
        let mut writer = MutationWriter::new(&mut buf);
        writer.set_text(ElementId(1), "hello");
        let len = writer.finalize();

        // Lop off the sentinel and half the payload.
        let err = read_mutations(&buf[..len - 4]).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }));
    }

    #[test]
    fn unknown_opcode_is_rejected() {
        let err = read_mutations(&[0x42]).unwrap_err();
        assert_eq!(err, DecodeError::UnknownOpcode { opcode: 0x42, at: 0 });
    }
}
