//! Instruction stream decoding.
//!
//! Only the call family and field instructions carry semantic operands here;
//! everything else is kept as opcode plus byte length so that the cursor stays
//! in sync. Branch targets are never followed.

use serde::Serialize;

use crate::constant_pool::{ConstantPool, RefKind};
use crate::error::{Error, Result};
use crate::member::MemberReference;
use crate::reader::{ByteReader, UnexpectedEof};

pub mod opcode {
    pub const ILOAD: u8 = 0x15;
    pub const ALOAD: u8 = 0x19;
    pub const ISTORE: u8 = 0x36;
    pub const ASTORE: u8 = 0x3a;
    pub const IINC: u8 = 0x84;
    pub const RET: u8 = 0xa9;
    pub const TABLESWITCH: u8 = 0xaa;
    pub const LOOKUPSWITCH: u8 = 0xab;
    pub const GETSTATIC: u8 = 0xb2;
    pub const PUTSTATIC: u8 = 0xb3;
    pub const GETFIELD: u8 = 0xb4;
    pub const PUTFIELD: u8 = 0xb5;
    pub const INVOKEVIRTUAL: u8 = 0xb6;
    pub const INVOKESPECIAL: u8 = 0xb7;
    pub const INVOKESTATIC: u8 = 0xb8;
    pub const INVOKEINTERFACE: u8 = 0xb9;
    pub const INVOKEDYNAMIC: u8 = 0xba;
    pub const WIDE: u8 = 0xc4;
}

/// Owner recorded for `invokedynamic` call sites, which have no owning class.
pub const DYNAMIC_CALL_OWNER: &str = "java/lang/Object";

/// Operand bytes following a fixed-length opcode; `None` for the
/// variable-length ones (`tableswitch`, `lookupswitch`, `wide`) and for
/// opcodes that are not part of the instruction set.
pub const fn fixed_operand_length(op: u8) -> Option<usize> {
    match op {
        0x00..=0x0f => Some(0),
        0x10 => Some(1),
        0x11 => Some(2),
        0x12 => Some(1),
        0x13 | 0x14 => Some(2),
        0x15..=0x19 => Some(1),
        0x1a..=0x35 => Some(0),
        0x36..=0x3a => Some(1),
        0x3b..=0x83 => Some(0),
        0x84 => Some(2),
        0x85..=0x98 => Some(0),
        0x99..=0xa8 => Some(2),
        0xa9 => Some(1),
        0xac..=0xb1 => Some(0),
        0xb2..=0xb8 => Some(2),
        0xb9 | 0xba => Some(4),
        0xbb => Some(2),
        0xbc => Some(1),
        0xbd => Some(2),
        0xbe | 0xbf => Some(0),
        0xc0 | 0xc1 => Some(2),
        0xc2 | 0xc3 => Some(0),
        0xc5 => Some(3),
        0xc6 | 0xc7 => Some(2),
        0xc8 | 0xc9 => Some(4),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InvokeKind {
    Virtual,
    Special,
    Static,
    Interface,
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FieldAccessKind {
    GetStatic,
    PutStatic,
    GetField,
    PutField,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Invoke {
        offset: usize,
        kind: InvokeKind,
        target: MemberReference,
    },
    FieldAccess {
        offset: usize,
        kind: FieldAccessKind,
        target: MemberReference,
    },
    Other {
        offset: usize,
        opcode: u8,
        length: usize,
    },
}

impl Instruction {
    pub fn offset(&self) -> usize {
        match self {
            Instruction::Invoke { offset, .. }
            | Instruction::FieldAccess { offset, .. }
            | Instruction::Other { offset, .. } => *offset,
        }
    }

    /// Encoded size in bytes, including switch padding and `wide` prefixes.
    pub fn length(&self) -> usize {
        match self {
            Instruction::Invoke {
                kind: InvokeKind::Interface | InvokeKind::Dynamic,
                ..
            } => 5,
            Instruction::Invoke { .. } | Instruction::FieldAccess { .. } => 3,
            Instruction::Other { length, .. } => *length,
        }
    }

    /// The referenced member for call and field instructions.
    pub fn target(&self) -> Option<&MemberReference> {
        match self {
            Instruction::Invoke { target, .. } | Instruction::FieldAccess { target, .. } => {
                Some(target)
            }
            Instruction::Other { .. } => None,
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Instruction::Invoke { .. })
    }
}

/// Decodes the raw bytes of one `Code` attribute.
pub fn decode(code: &[u8], pool: &ConstantPool) -> Result<Vec<Instruction>> {
    let mut r = ByteReader::new(code);
    let mut instructions = Vec::new();
    while !r.is_empty() {
        let offset = r.position();
        instructions.push(decode_one(&mut r, pool, offset)?);
    }
    Ok(instructions)
}

fn malformed(offset: usize, reason: impl Into<String>) -> Error {
    Error::MalformedBytecode {
        offset,
        reason: reason.into(),
    }
}

fn decode_one(r: &mut ByteReader<'_>, pool: &ConstantPool, offset: usize) -> Result<Instruction> {
    let eof = |e: UnexpectedEof| malformed(offset, format!("truncated instruction: {e}"));
    let unresolved = |e: Error| malformed(offset, format!("unresolvable operand: {e}"));

    let op = r.read_u8().map_err(eof)?;
    match op {
        opcode::INVOKEVIRTUAL | opcode::INVOKESPECIAL | opcode::INVOKESTATIC => {
            let index = r.read_u16().map_err(eof)?;
            let (ref_kind, target) = pool.member_ref(index).map_err(unresolved)?;
            let kind = match op {
                opcode::INVOKEVIRTUAL => InvokeKind::Virtual,
                opcode::INVOKESPECIAL => InvokeKind::Special,
                _ => InvokeKind::Static,
            };
            match (kind, ref_kind) {
                (_, RefKind::Field) | (InvokeKind::Virtual, RefKind::InterfaceMethod) => {
                    return Err(malformed(
                        offset,
                        format!("{kind:?} call through {ref_kind:?} reference #{index}"),
                    ));
                }
                _ => {}
            }
            Ok(Instruction::Invoke {
                offset,
                kind,
                target,
            })
        }
        opcode::INVOKEINTERFACE => {
            let index = r.read_u16().map_err(eof)?;
            let count = r.read_u8().map_err(eof)?;
            let zero = r.read_u8().map_err(eof)?;
            if count == 0 {
                return Err(malformed(offset, "invokeinterface argument count is zero"));
            }
            if zero != 0 {
                return Err(malformed(
                    offset,
                    format!("invokeinterface padding byte is {zero:#04x}"),
                ));
            }
            let (ref_kind, target) = pool.member_ref(index).map_err(unresolved)?;
            if ref_kind != RefKind::InterfaceMethod {
                return Err(malformed(
                    offset,
                    format!("invokeinterface through {ref_kind:?} reference #{index}"),
                ));
            }
            Ok(Instruction::Invoke {
                offset,
                kind: InvokeKind::Interface,
                target,
            })
        }
        opcode::INVOKEDYNAMIC => {
            let index = r.read_u16().map_err(eof)?;
            let padding = r.read_u16().map_err(eof)?;
            if padding != 0 {
                return Err(malformed(
                    offset,
                    format!("invokedynamic padding is {padding:#06x}"),
                ));
            }
            let (_, name, descriptor) = pool.invoke_dynamic(index).map_err(unresolved)?;
            Ok(Instruction::Invoke {
                offset,
                kind: InvokeKind::Dynamic,
                target: MemberReference::new(DYNAMIC_CALL_OWNER, name, descriptor),
            })
        }
        opcode::GETSTATIC..=opcode::PUTFIELD => {
            let index = r.read_u16().map_err(eof)?;
            let (ref_kind, target) = pool.member_ref(index).map_err(unresolved)?;
            if ref_kind != RefKind::Field {
                return Err(malformed(
                    offset,
                    format!("field access through {ref_kind:?} reference #{index}"),
                ));
            }
            let kind = match op {
                opcode::GETSTATIC => FieldAccessKind::GetStatic,
                opcode::PUTSTATIC => FieldAccessKind::PutStatic,
                opcode::GETFIELD => FieldAccessKind::GetField,
                _ => FieldAccessKind::PutField,
            };
            Ok(Instruction::FieldAccess {
                offset,
                kind,
                target,
            })
        }
        opcode::TABLESWITCH => {
            r.align4().map_err(eof)?;
            let _default = r.read_i32().map_err(eof)?;
            let low = r.read_i32().map_err(eof)?;
            let high = r.read_i32().map_err(eof)?;
            let cases = high as i64 - low as i64 + 1;
            if cases < 0 {
                return Err(malformed(
                    offset,
                    format!("tableswitch low {low} exceeds high {high}"),
                ));
            }
            skip_words(r, cases as u64 * 4, offset)?;
            Ok(other(offset, op, r))
        }
        opcode::LOOKUPSWITCH => {
            r.align4().map_err(eof)?;
            let _default = r.read_i32().map_err(eof)?;
            let pairs = r.read_i32().map_err(eof)?;
            if pairs < 0 {
                return Err(malformed(
                    offset,
                    format!("lookupswitch has negative pair count {pairs}"),
                ));
            }
            skip_words(r, pairs as u64 * 8, offset)?;
            Ok(other(offset, op, r))
        }
        opcode::WIDE => {
            let modified = r.read_u8().map_err(eof)?;
            let operands = match modified {
                opcode::ILOAD..=opcode::ALOAD | opcode::ISTORE..=opcode::ASTORE | opcode::RET => 2,
                opcode::IINC => 4,
                unsupported => {
                    return Err(malformed(
                        offset,
                        format!("wide cannot modify opcode {unsupported:#04x}"),
                    ));
                }
            };
            r.skip(operands).map_err(eof)?;
            Ok(other(offset, op, r))
        }
        _ => {
            let Some(operands) = fixed_operand_length(op) else {
                return Err(malformed(offset, format!("unknown opcode {op:#04x}")));
            };
            r.skip(operands).map_err(eof)?;
            Ok(other(offset, op, r))
        }
    }
}

fn skip_words(r: &mut ByteReader<'_>, len: u64, offset: usize) -> Result<()> {
    let len = usize::try_from(len)
        .map_err(|_| malformed(offset, format!("switch table of {len} bytes")))?;
    r.skip(len)
        .map_err(|e| malformed(offset, format!("truncated switch table: {e}")))
}

fn other(offset: usize, opcode: u8, r: &ByteReader<'_>) -> Instruction {
    Instruction::Other {
        offset,
        opcode,
        length: r.position() - offset,
    }
}
