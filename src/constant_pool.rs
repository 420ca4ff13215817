//! Constant pool decoding and index resolution.
//!
//! The pool is 1-indexed. `Long` and `Double` constants take two slots; the
//! second one is stored as [`ConstantPoolEntry::Reserved`] and is never a valid
//! lookup target. References between entries are validated once after parsing,
//! and every resolver re-checks kinds on the way, so a bad index surfaces as
//! [`Error::MalformedConstantPool`] instead of garbage.
//!
//! `Utf8` entries hold the JVM's modified UTF-8 decoded into a [`JavaString`],
//! which can carry unpaired surrogates. Those only become an error when the
//! entry is used as a name or descriptor through [`ConstantPool::utf8`].

use java_string::{JavaStr, JavaString};

use crate::error::{Error, Result};
use crate::member::MemberReference;
use crate::reader::{ByteReader, UnexpectedEof};

pub mod tag {
    pub const UTF8: u8 = 1;
    pub const INTEGER: u8 = 3;
    pub const FLOAT: u8 = 4;
    pub const LONG: u8 = 5;
    pub const DOUBLE: u8 = 6;
    pub const CLASS: u8 = 7;
    pub const STRING: u8 = 8;
    pub const FIELDREF: u8 = 9;
    pub const METHODREF: u8 = 10;
    pub const INTERFACE_METHODREF: u8 = 11;
    pub const NAME_AND_TYPE: u8 = 12;
    pub const METHOD_HANDLE: u8 = 15;
    pub const METHOD_TYPE: u8 = 16;
    pub const DYNAMIC: u8 = 17;
    pub const INVOKE_DYNAMIC: u8 = 18;
    pub const MODULE: u8 = 19;
    pub const PACKAGE: u8 = 20;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstantPoolEntry {
    Utf8(JavaString),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class {
        name_index: u16,
    },
    String {
        string_index: u16,
    },
    Fieldref {
        class_index: u16,
        name_and_type_index: u16,
    },
    Methodref {
        class_index: u16,
        name_and_type_index: u16,
    },
    InterfaceMethodref {
        class_index: u16,
        name_and_type_index: u16,
    },
    NameAndType {
        name_index: u16,
        descriptor_index: u16,
    },
    MethodHandle {
        reference_kind: u8,
        reference_index: u16,
    },
    MethodType {
        descriptor_index: u16,
    },
    Dynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    InvokeDynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    Module {
        name_index: u16,
    },
    Package {
        name_index: u16,
    },
    /// Upper half of a preceding `Long` or `Double`.
    Reserved,
}

impl ConstantPoolEntry {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ConstantPoolEntry::Utf8(_) => "Utf8",
            ConstantPoolEntry::Integer(_) => "Integer",
            ConstantPoolEntry::Float(_) => "Float",
            ConstantPoolEntry::Long(_) => "Long",
            ConstantPoolEntry::Double(_) => "Double",
            ConstantPoolEntry::Class { .. } => "Class",
            ConstantPoolEntry::String { .. } => "String",
            ConstantPoolEntry::Fieldref { .. } => "Fieldref",
            ConstantPoolEntry::Methodref { .. } => "Methodref",
            ConstantPoolEntry::InterfaceMethodref { .. } => "InterfaceMethodref",
            ConstantPoolEntry::NameAndType { .. } => "NameAndType",
            ConstantPoolEntry::MethodHandle { .. } => "MethodHandle",
            ConstantPoolEntry::MethodType { .. } => "MethodType",
            ConstantPoolEntry::Dynamic { .. } => "Dynamic",
            ConstantPoolEntry::InvokeDynamic { .. } => "InvokeDynamic",
            ConstantPoolEntry::Module { .. } => "Module",
            ConstantPoolEntry::Package { .. } => "Package",
            ConstantPoolEntry::Reserved => "Reserved",
        }
    }
}

/// Which of the three member-reference entry kinds an index pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Field,
    Method,
    InterfaceMethod,
}

#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    entries: Vec<ConstantPoolEntry>,
}

macro_rules! malformed_pool {
    ($($arg:tt)*) => {
        Error::MalformedConstantPool(format!($($arg)*))
    };
}

impl ConstantPool {
    /// Decodes `count - 1` slots from `reader`, which must sit right after the
    /// `constant_pool_count` field.
    pub fn parse(reader: &mut ByteReader<'_>, count: u16) -> Result<Self> {
        if count == 0 {
            return Err(malformed_pool!("constant_pool_count must be at least 1"));
        }

        let slots = count as usize - 1;
        let mut entries = Vec::with_capacity(slots);
        while entries.len() < slots {
            let index = entries.len() + 1;
            let entry = read_entry(reader, index)?;
            let wide = matches!(
                entry,
                ConstantPoolEntry::Long(_) | ConstantPoolEntry::Double(_)
            );
            entries.push(entry);
            if wide {
                if entries.len() == slots {
                    return Err(malformed_pool!(
                        "8-byte constant at #{index} overruns the pool"
                    ));
                }
                entries.push(ConstantPoolEntry::Reserved);
            }
        }

        let pool = Self { entries };
        pool.validate()?;
        Ok(pool)
    }

    /// Number of addressable slots, i.e. `constant_pool_count - 1`.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: u16) -> Result<&ConstantPoolEntry> {
        let entry = (index as usize)
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .ok_or_else(|| {
                malformed_pool!("index #{index} outside pool of {} slots", self.len())
            })?;
        if matches!(entry, ConstantPoolEntry::Reserved) {
            return Err(malformed_pool!(
                "index #{index} is the reserved upper half of an 8-byte constant"
            ));
        }
        Ok(entry)
    }

    pub fn java_utf8(&self, index: u16) -> Result<&JavaStr> {
        match self.get(index)? {
            ConstantPoolEntry::Utf8(s) => Ok(s),
            other => Err(wrong_kind(index, "Utf8", other)),
        }
    }

    /// A `Utf8` entry that must be valid Unicode, e.g. a name or descriptor.
    pub fn utf8(&self, index: u16) -> Result<&str> {
        self.java_utf8(index)?
            .as_str()
            .map_err(|e| malformed_pool!("index #{index} is not valid Unicode: {e}"))
    }

    /// Internal name of a `Class` entry, e.g. `com/acme/Util` or, for array
    /// classes, a descriptor such as `[Ljava/lang/String;`.
    pub fn class_name(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            ConstantPoolEntry::Class { name_index } => self.utf8(*name_index),
            other => Err(wrong_kind(index, "Class", other)),
        }
    }

    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str)> {
        match self.get(index)? {
            ConstantPoolEntry::NameAndType {
                name_index,
                descriptor_index,
            } => Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?)),
            other => Err(wrong_kind(index, "NameAndType", other)),
        }
    }

    /// Resolves a `Fieldref`, `Methodref` or `InterfaceMethodref` to its owner,
    /// name and descriptor.
    pub fn member_ref(&self, index: u16) -> Result<(RefKind, MemberReference)> {
        let (kind, class_index, name_and_type_index) = match self.get(index)? {
            ConstantPoolEntry::Fieldref {
                class_index,
                name_and_type_index,
            } => (RefKind::Field, *class_index, *name_and_type_index),
            ConstantPoolEntry::Methodref {
                class_index,
                name_and_type_index,
            } => (RefKind::Method, *class_index, *name_and_type_index),
            ConstantPoolEntry::InterfaceMethodref {
                class_index,
                name_and_type_index,
            } => (RefKind::InterfaceMethod, *class_index, *name_and_type_index),
            other => return Err(wrong_kind(index, "Fieldref/Methodref", other)),
        };

        let owner = self.class_name(class_index)?;
        let (name, descriptor) = self.name_and_type(name_and_type_index)?;
        if owner.is_empty() || name.is_empty() || descriptor.is_empty() {
            return Err(malformed_pool!("member reference #{index} has an empty component"));
        }
        Ok((kind, MemberReference::new(owner, name, descriptor)))
    }

    /// Resolves an `InvokeDynamic` entry to its bootstrap method index and
    /// call-site name and descriptor.
    pub fn invoke_dynamic(&self, index: u16) -> Result<(u16, &str, &str)> {
        match self.get(index)? {
            ConstantPoolEntry::InvokeDynamic {
                bootstrap_method_attr_index,
                name_and_type_index,
            } => {
                let (name, descriptor) = self.name_and_type(*name_and_type_index)?;
                Ok((*bootstrap_method_attr_index, name, descriptor))
            }
            other => Err(wrong_kind(index, "InvokeDynamic", other)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &ConstantPoolEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !matches!(e, ConstantPoolEntry::Reserved))
            .map(|(i, e)| ((i + 1) as u16, e))
    }

    fn validate(&self) -> Result<()> {
        for (index, entry) in self.iter() {
            let checked = match entry {
                ConstantPoolEntry::Class { name_index }
                | ConstantPoolEntry::Module { name_index }
                | ConstantPoolEntry::Package { name_index } => self.utf8(*name_index).map(drop),
                ConstantPoolEntry::String { string_index } => {
                    self.java_utf8(*string_index).map(drop)
                }
                ConstantPoolEntry::MethodType { descriptor_index } => {
                    self.utf8(*descriptor_index).map(drop)
                }
                ConstantPoolEntry::NameAndType { .. } => self.name_and_type(index).map(drop),
                ConstantPoolEntry::Fieldref { .. }
                | ConstantPoolEntry::Methodref { .. }
                | ConstantPoolEntry::InterfaceMethodref { .. } => {
                    self.member_ref(index).map(drop)
                }
                ConstantPoolEntry::Dynamic {
                    name_and_type_index,
                    ..
                }
                | ConstantPoolEntry::InvokeDynamic {
                    name_and_type_index,
                    ..
                } => self.name_and_type(*name_and_type_index).map(drop),
                ConstantPoolEntry::MethodHandle {
                    reference_index, ..
                } => self.member_ref(*reference_index).map(drop),
                _ => Ok(()),
            };
            checked.map_err(|e| match e {
                Error::MalformedConstantPool(msg) => {
                    malformed_pool!("entry #{index} ({}): {msg}", entry.kind_name())
                }
                other => other,
            })?;
        }
        Ok(())
    }
}

fn wrong_kind(index: u16, expected: &str, found: &ConstantPoolEntry) -> Error {
    malformed_pool!(
        "index #{index} should be {expected}, found {}",
        found.kind_name()
    )
}

fn read_entry(reader: &mut ByteReader<'_>, index: usize) -> Result<ConstantPoolEntry> {
    let eof = |e: UnexpectedEof| malformed_pool!("entry #{index}: {e}");

    let tag = reader.read_u8().map_err(eof)?;
    let entry = match tag {
        tag::UTF8 => {
            let len = reader.read_u16().map_err(eof)? as usize;
            let bytes = reader.read_bytes(len).map_err(eof)?;
            ConstantPoolEntry::Utf8(
                JavaStr::from_modified_utf8(bytes)
                    .map_err(|e| malformed_pool!("entry #{index}: invalid modified UTF-8: {e}"))?
                    .into_owned(),
            )
        }
        tag::INTEGER => ConstantPoolEntry::Integer(reader.read_i32().map_err(eof)?),
        tag::FLOAT => ConstantPoolEntry::Float(f32::from_bits(reader.read_u32().map_err(eof)?)),
        tag::LONG => {
            let hi = reader.read_u32().map_err(eof)? as u64;
            let lo = reader.read_u32().map_err(eof)? as u64;
            ConstantPoolEntry::Long(((hi << 32) | lo) as i64)
        }
        tag::DOUBLE => {
            let hi = reader.read_u32().map_err(eof)? as u64;
            let lo = reader.read_u32().map_err(eof)? as u64;
            ConstantPoolEntry::Double(f64::from_bits((hi << 32) | lo))
        }
        tag::CLASS => ConstantPoolEntry::Class {
            name_index: reader.read_u16().map_err(eof)?,
        },
        tag::STRING => ConstantPoolEntry::String {
            string_index: reader.read_u16().map_err(eof)?,
        },
        tag::FIELDREF | tag::METHODREF | tag::INTERFACE_METHODREF => {
            let class_index = reader.read_u16().map_err(eof)?;
            let name_and_type_index = reader.read_u16().map_err(eof)?;
            match tag {
                tag::FIELDREF => ConstantPoolEntry::Fieldref {
                    class_index,
                    name_and_type_index,
                },
                tag::METHODREF => ConstantPoolEntry::Methodref {
                    class_index,
                    name_and_type_index,
                },
                _ => ConstantPoolEntry::InterfaceMethodref {
                    class_index,
                    name_and_type_index,
                },
            }
        }
        tag::NAME_AND_TYPE => ConstantPoolEntry::NameAndType {
            name_index: reader.read_u16().map_err(eof)?,
            descriptor_index: reader.read_u16().map_err(eof)?,
        },
        tag::METHOD_HANDLE => ConstantPoolEntry::MethodHandle {
            reference_kind: reader.read_u8().map_err(eof)?,
            reference_index: reader.read_u16().map_err(eof)?,
        },
        tag::METHOD_TYPE => ConstantPoolEntry::MethodType {
            descriptor_index: reader.read_u16().map_err(eof)?,
        },
        tag::DYNAMIC => ConstantPoolEntry::Dynamic {
            bootstrap_method_attr_index: reader.read_u16().map_err(eof)?,
            name_and_type_index: reader.read_u16().map_err(eof)?,
        },
        tag::INVOKE_DYNAMIC => ConstantPoolEntry::InvokeDynamic {
            bootstrap_method_attr_index: reader.read_u16().map_err(eof)?,
            name_and_type_index: reader.read_u16().map_err(eof)?,
        },
        tag::MODULE => ConstantPoolEntry::Module {
            name_index: reader.read_u16().map_err(eof)?,
        },
        tag::PACKAGE => ConstantPoolEntry::Package {
            name_index: reader.read_u16().map_err(eof)?,
        },
        unknown => return Err(malformed_pool!("entry #{index}: unknown tag {unknown}")),
    };
    Ok(entry)
}
