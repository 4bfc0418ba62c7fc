//! A single decoded instruction: opcode, unpacked arguments, and the derived
//! stack effect and control-flow facts later passes key off of.

use crate::bytes::Cursor;
use crate::error::Error;
use crate::opcode::{self, ArgKind, OpcodeSchema, PrintFormat};

/// Which schema row produced an [`Operation`].
///
/// `Data` has no schema row at all — it is synthesized by
/// [`crate::decoder::Decoder::fill_gaps`] for byte ranges no control-flow
/// edge ever reaches, and simply echoes its bytes back as a comment.
///
/// `Failed` covers an opcode byte `crate::opcode::MISSING` names a fixed
/// length for but that carries no schema row of its own — it decompiles to
/// a commented hex dump instead of aborting decode.
#[derive(Debug, Clone, Copy)]
pub enum Schema {
    Static(&'static OpcodeSchema),
    Data,
    Failed { op_id: u8 },
}

#[derive(Debug, Clone)]
pub struct Operation {
    pub address: u32,
    pub schema: Schema,
    pub raw_args: Vec<i64>,
    pub size: u32,
    pub pops: u8,
    pub pushes: u8,
    pub jump_target: Option<u32>,
    pub call_target: Option<u32>,
    /// Filled in once [`crate::decoder::Decoder::generate_labels`] has run.
    pub sub_label: Option<String>,
    pub loc_label: Option<String>,
}

impl Operation {
    pub fn mnemonic(&self) -> &'static str {
        match self.schema {
            Schema::Static(s) => s.mnemonic,
            Schema::Data => "data",
            Schema::Failed { .. } => "failed",
        }
    }

    pub fn is_jump(&self) -> bool {
        matches!(self.schema, Schema::Static(s) if s.is_jump)
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self.schema, Schema::Static(s) if s.is_conditional)
    }

    pub fn is_call(&self) -> bool {
        matches!(self.schema, Schema::Static(s) if s.is_call)
    }

    pub fn bounded(&self) -> bool {
        matches!(self.schema, Schema::Static(s) if s.bounded)
    }

    pub fn is_main_start(&self) -> bool {
        matches!(self.schema, Schema::Static(s) if s.op_id == 0x01)
    }

    pub fn is_main_end(&self) -> bool {
        matches!(self.schema, Schema::Static(s) if s.op_id == 0x00)
    }

    pub fn is_alloc(&self) -> bool {
        matches!(self.schema, Schema::Static(s) if s.op_id == 0x03)
    }

    pub fn is_push(&self) -> bool {
        matches!(self.schema, Schema::Static(s) if s.op_id == 0x04)
    }

    pub fn is_pop(&self) -> bool {
        matches!(self.schema, Schema::Static(s) if s.op_id == 0x06)
    }

    pub fn is_remap(&self) -> bool {
        matches!(self.schema, Schema::Static(s) if s.op_id == 0x02)
    }

    pub fn is_unmap(&self) -> bool {
        matches!(self.schema, Schema::Static(s) if s.op_id == 0x31)
    }

    pub fn is_simple(&self) -> bool {
        matches!(self.schema, Schema::Static(s) if s.simple)
    }

    /// The slot a `push`/`pop` instruction addresses, if any.
    pub fn var_slot(&self) -> Option<i64> {
        if self.is_push() || self.is_pop() {
            self.raw_args.first().copied()
        } else {
            None
        }
    }

    pub fn is_call_op(&self) -> bool {
        matches!(self.schema, Schema::Static(s) if s.op_id == 0x36)
    }

    pub fn is_ret(&self) -> bool {
        matches!(self.schema, Schema::Static(s) if s.op_id == 0x37)
    }

    /// Decodes one instruction starting at `address`. The cursor must
    /// already be positioned there; the opcode byte itself is consumed as
    /// part of this call.
    pub fn decode_one(cursor: &mut Cursor<'_>, address: u32) -> Result<Operation, Error> {
        let byte = cursor.read_u8()?;
        let schema = opcode::lookup(byte).ok_or(Error::UnknownOpcode { address, byte })?;

        let mut raw_args = Vec::with_capacity(schema.arguments.len());
        for kind in schema.arguments {
            let value = match kind {
                ArgKind::U8 => cursor.read_u8()? as i64,
                ArgKind::I16 => cursor.read_i16_le()? as i64,
            };
            raw_args.push(value);
        }
        let size = cursor.consumed() as u32;

        let (pops, pushes) = match schema.op_id {
            0x36 => (raw_args[1] as u8, raw_args[2] as u8),
            0x37 => (raw_args[0] as u8, 0),
            _ => (schema.pops.unwrap_or(0), schema.pushes.unwrap_or(0)),
        };

        let target = schema
            .target_arg_index
            .map(|idx| raw_args[idx] as u32);
        let jump_target = if schema.is_jump { target } else { None };
        let call_target = if schema.is_call { target } else { None };

        Ok(Operation {
            address,
            schema: Schema::Static(schema),
            raw_args,
            size,
            pops,
            pushes,
            jump_target,
            call_target,
            sub_label: None,
            loc_label: None,
        })
    }

    /// Synthesizes a `data` pseudo-operation covering `bytes.len()` bytes
    /// starting at `address`, for a span [`crate::decoder::Decoder::fill_gaps`]
    /// never reached by control flow.
    pub fn data(address: u32, bytes: &[u8]) -> Operation {
        Operation {
            address,
            schema: Schema::Data,
            raw_args: bytes.iter().map(|b| *b as i64).collect(),
            size: bytes.len() as u32,
            pops: 0,
            pushes: 0,
            jump_target: None,
            call_target: None,
            sub_label: None,
            loc_label: None,
        }
    }

    /// Synthesizes a `Failed` pseudo-operation for an opcode byte
    /// `crate::opcode::MISSING` names a fixed length for but that has no
    /// real schema row, covering `bytes.len()` argument bytes after the
    /// opcode byte itself.
    pub fn failed(address: u32, op_id: u8, bytes: &[u8]) -> Operation {
        Operation {
            address,
            schema: Schema::Failed { op_id },
            raw_args: bytes.iter().map(|b| *b as i64).collect(),
            size: bytes.len() as u32 + 1,
            pops: 0,
            pushes: 0,
            jump_target: None,
            call_target: None,
            sub_label: None,
            loc_label: None,
        }
    }

    /// One raw-argument-dump line, as used by `gbc-dump`.
    pub fn dump_args(&self) -> String {
        match self.schema {
            Schema::Data | Schema::Failed { .. } => self
                .raw_args
                .iter()
                .map(|b| format!("{:02X}", b))
                .collect::<Vec<_>>()
                .join(" "),
            Schema::Static(s) => s
                .print_formats
                .iter()
                .zip(&self.raw_args)
                .map(|(fmt, value)| render_print(*fmt, *value))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Renders this instruction's contribution to a decompiled expression,
    /// given its already-rendered child source texts (in stack order) and a
    /// callback resolving a variable slot index to its display name.
    ///
    /// `call`/`ret` are handled here directly rather than through the
    /// schema's template since their arity is read from their own
    /// arguments, not fixed at the schema level.
    pub fn render(&self, children: &[String], var_name: impl Fn(i64) -> String) -> String {
        let schema = match self.schema {
            Schema::Static(s) => s,
            Schema::Data => {
                return format!(
                    "data({})",
                    self.raw_args
                        .iter()
                        .map(|b| b.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            Schema::Failed { op_id } => {
                return format!(
                    "// OP_{:02X}\t{}",
                    op_id,
                    self.raw_args
                        .iter()
                        .map(|b| format!("{:02X}", b))
                        .collect::<Vec<_>>()
                        .join(" ")
                );
            }
        };

        if schema.op_id == 0x36 {
            let target = self
                .sub_label
                .clone()
                .unwrap_or_else(|| format!("sub_{:04X}", self.call_target.unwrap_or(0)));
            return format!("{}({})", target, children.join(", "));
        }
        if schema.op_id == 0x37 {
            return match children.first() {
                Some(value) => format!("return {}", value),
                None => "return".to_string(),
            };
        }

        let mut args: Vec<String> = Vec::with_capacity(self.raw_args.len() + children.len());
        for (i, value) in self.raw_args.iter().enumerate() {
            let rendered = if schema.variables.get(i).copied().unwrap_or(false) {
                var_name(*value)
            } else if let Some(Some(table)) = schema.constants.get(i) {
                table.render(*value)
            } else {
                value.to_string()
            };
            args.push(rendered);
        }
        args.extend(children.iter().cloned());

        schema
            .decompile_template()
            .map(|t| t.render(&args))
            .unwrap_or_default()
    }
}

fn render_print(fmt: PrintFormat, value: i64) -> String {
    match fmt {
        PrintFormat::VarByte => format!("var_{:02X}", value),
        PrintFormat::Loc => format!("loc_{:04X}", value),
        PrintFormat::Sub => format!("sub_{:04X}", value),
        PrintFormat::Immediate => format!("0x{:X}", value),
        PrintFormat::HexByte => format!("{:02X}", value),
        PrintFormat::HexWord => format!("{:04X}", value),
        PrintFormat::ArgIndex => format!("a{}", value),
        PrintFormat::ArgIndexHex => format!("arg_{:X}", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_pushi_with_signed_argument() {
        let data = [0x05, 0xD6, 0xFF]; // pushi -42
        let mut cursor = Cursor::new(&data, 0);
        let op = Operation::decode_one(&mut cursor, 0).unwrap();
        assert_eq!(op.mnemonic(), "pushi");
        assert_eq!(op.raw_args, vec![-42]);
        assert_eq!(op.size, 3);
        assert_eq!(op.pushes, 1);
    }

    #[test]
    fn unknown_opcode_is_an_error() {
        let data = [0xFF];
        let mut cursor = Cursor::new(&data, 0);
        assert!(matches!(
            Operation::decode_one(&mut cursor, 0),
            Err(Error::UnknownOpcode { byte: 0xFF, .. })
        ));
    }

    #[test]
    fn call_reads_arity_from_its_own_arguments() {
        // call loc=0x0010, pops=1, pushes=1
        let data = [0x36, 0x10, 0x00, 0x01, 0x01];
        let mut cursor = Cursor::new(&data, 0);
        let op = Operation::decode_one(&mut cursor, 0).unwrap();
        assert_eq!(op.pops, 1);
        assert_eq!(op.pushes, 1);
        assert_eq!(op.call_target, Some(0x10));
    }

    #[test]
    fn pushi_renders_its_immediate() {
        let data = [0x05, 0x2A, 0x00];
        let mut cursor = Cursor::new(&data, 0);
        let op = Operation::decode_one(&mut cursor, 0).unwrap();
        assert_eq!(op.render(&[], |v| v.to_string()), "42");
    }

    #[test]
    fn pop_renders_assignment_using_variable_name() {
        let data = [0x06, 0x00, 0x00];
        let mut cursor = Cursor::new(&data, 0);
        let op = Operation::decode_one(&mut cursor, 0).unwrap();
        let rendered = op.render(&["42".to_string()], |v| format!("v{v}"));
        assert_eq!(rendered, "v0 = 42");
    }
}
