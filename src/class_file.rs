//! Class-file container decoding.
//!
//! [`ClassFile::parse`] walks the whole container (header, constant pool,
//! super types, fields, methods, attributes) so that the cursor stays aligned,
//! but keeps only what the scanner needs: names, method descriptors and the
//! raw bytes of each `Code` attribute. Instructions are decoded on first use by
//! [`Code::instructions`].
//!
//! A `Code` attribute carries its own length, so an inconsistent body does not
//! desynchronize the class. Such a body is kept on its method as a fault and
//! surfaces from [`MethodInfo::code`], failing that method only.

use std::sync::OnceLock;

use crate::bytecode::{self, Instruction};
use crate::constant_pool::ConstantPool;
use crate::error::{Error, Result};
use crate::member::dotted;
use crate::reader::{ByteReader, UnexpectedEof};

pub const MAGIC: u32 = 0xCAFE_BABE;

/// JDK 1.0.2. Older files predate the layout decoded here.
pub const MIN_MAJOR_VERSION: u16 = 45;

const CODE_ATTRIBUTE: &str = "Code";

#[derive(Debug, Clone)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub access_flags: u16,
    this_class: String,
    super_class: Option<String>,
    interfaces: Vec<String>,
    fields_count: usize,
    constant_pool: ConstantPool,
    methods: Vec<MethodInfo>,
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub access_flags: u16,
    name: String,
    descriptor: String,
    code: Option<std::result::Result<Code, CodeFault>>,
}

/// Why a method's `Code` body could not be read, with the offset inside the
/// attribute body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFault {
    pub offset: usize,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    bytecode: Vec<u8>,
    decoded: OnceLock<Vec<Instruction>>,
}

fn truncated(what: &'static str) -> impl Fn(UnexpectedEof) -> Error {
    move |e| Error::MalformedClassFile(format!("{what}: {e}"))
}

fn code_truncated(what: &'static str) -> impl Fn(UnexpectedEof) -> CodeFault {
    move |e| CodeFault {
        offset: e.offset,
        reason: format!("{what}: {e}"),
    }
}

impl ClassFile {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(bytes);

        let magic = r.read_u32().map_err(|_| Error::NotAClassFile)?;
        if magic != MAGIC {
            return Err(Error::NotAClassFile);
        }

        let minor_version = r.read_u16().map_err(truncated("minor_version"))?;
        let major_version = r.read_u16().map_err(truncated("major_version"))?;
        if major_version < MIN_MAJOR_VERSION {
            return Err(Error::UnsupportedClassVersion {
                major: major_version,
                minor: minor_version,
            });
        }

        let pool_count = r.read_u16().map_err(truncated("constant_pool_count"))?;
        let constant_pool = ConstantPool::parse(&mut r, pool_count)?;

        let access_flags = r.read_u16().map_err(truncated("access_flags"))?;
        let this_index = r.read_u16().map_err(truncated("this_class"))?;
        let this_class = constant_pool.class_name(this_index)?.to_string();

        let super_index = r.read_u16().map_err(truncated("super_class"))?;
        let super_class = match super_index {
            0 => None,
            index => Some(constant_pool.class_name(index)?.to_string()),
        };

        let interfaces_count = r.read_u16().map_err(truncated("interfaces_count"))?;
        let mut interfaces = Vec::with_capacity(interfaces_count as usize);
        for _ in 0..interfaces_count {
            let index = r.read_u16().map_err(truncated("interfaces"))?;
            interfaces.push(constant_pool.class_name(index)?.to_string());
        }

        let fields_count = r.read_u16().map_err(truncated("fields_count"))? as usize;
        for _ in 0..fields_count {
            r.skip(6).map_err(truncated("field_info"))?;
            skip_attributes(&mut r, "field attributes")?;
        }

        let methods_count = r.read_u16().map_err(truncated("methods_count"))?;
        let mut methods = Vec::with_capacity(methods_count as usize);
        for _ in 0..methods_count {
            methods.push(MethodInfo::parse(&mut r, &constant_pool)?);
        }

        skip_attributes(&mut r, "class attributes")?;

        Ok(Self {
            minor_version,
            major_version,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields_count,
            constant_pool,
            methods,
        })
    }

    /// Internal name, e.g. `com/acme/Util`.
    pub fn name(&self) -> &str {
        &self.this_class
    }

    pub fn dotted_name(&self) -> String {
        dotted(&self.this_class)
    }

    pub fn super_class(&self) -> Option<&str> {
        self.super_class.as_deref()
    }

    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    pub fn fields_count(&self) -> usize {
        self.fields_count
    }

    pub fn constant_pool(&self) -> &ConstantPool {
        &self.constant_pool
    }

    /// Methods in declaration order.
    pub fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }
}

impl MethodInfo {
    fn parse(r: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<Self> {
        let access_flags = r.read_u16().map_err(truncated("method access_flags"))?;
        let name = pool
            .utf8(r.read_u16().map_err(truncated("method name_index"))?)?
            .to_string();
        let descriptor = pool
            .utf8(r.read_u16().map_err(truncated("method descriptor_index"))?)?
            .to_string();

        let mut code = None;
        let attributes_count = r.read_u16().map_err(truncated("method attributes_count"))?;
        for _ in 0..attributes_count {
            let name_index = r.read_u16().map_err(truncated("attribute_name_index"))?;
            let length = r.read_u32().map_err(truncated("attribute_length"))? as usize;
            let body = r.read_bytes(length).map_err(truncated("method attribute"))?;

            if pool.utf8(name_index)? != CODE_ATTRIBUTE {
                continue;
            }
            if code.is_some() {
                return Err(Error::MalformedClassFile(format!(
                    "method {name}{descriptor} has more than one Code attribute"
                )));
            }
            code = Some(Code::parse(body));
        }

        Ok(Self {
            access_flags,
            name,
            descriptor,
            code,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// `Ok(None)` for abstract and native methods. A `Code` body that could not
    /// be read is reported as [`Error::MalformedBytecode`].
    pub fn code(&self) -> Result<Option<&Code>> {
        match &self.code {
            None => Ok(None),
            Some(Ok(code)) => Ok(Some(code)),
            Some(Err(fault)) => Err(Error::MalformedBytecode {
                offset: fault.offset,
                reason: format!("Code attribute of {}{}: {}", self.name, self.descriptor, fault.reason),
            }),
        }
    }

    /// `com.acme.Foo.run()V`, the caller identity used in reports.
    pub fn identity(&self, owner: &ClassFile) -> String {
        format!("{}.{}{}", owner.dotted_name(), self.name, self.descriptor)
    }
}

impl Code {
    fn parse(body: &[u8]) -> std::result::Result<Self, CodeFault> {
        let mut r = ByteReader::new(body);
        let max_stack = r.read_u16().map_err(code_truncated("max_stack"))?;
        let max_locals = r.read_u16().map_err(code_truncated("max_locals"))?;
        let code_length = r.read_u32().map_err(code_truncated("code_length"))? as usize;
        let bytecode = r
            .read_bytes(code_length)
            .map_err(code_truncated("code"))?
            .to_vec();

        let exception_table_length = r
            .read_u16()
            .map_err(code_truncated("exception_table_length"))?;
        r.skip(exception_table_length as usize * 8)
            .map_err(code_truncated("exception_table"))?;
        let attributes_count = r.read_u16().map_err(code_truncated("attributes_count"))?;
        for _ in 0..attributes_count {
            r.skip(2).map_err(code_truncated("attribute_name_index"))?;
            let length = r.read_u32().map_err(code_truncated("attribute_length"))? as usize;
            r.skip(length).map_err(code_truncated("attribute"))?;
        }

        if !r.is_empty() {
            return Err(CodeFault {
                offset: r.position(),
                reason: format!("{} trailing bytes", r.remaining()),
            });
        }

        Ok(Self::from_bytecode(max_stack, max_locals, bytecode))
    }

    pub fn from_bytecode(max_stack: u16, max_locals: u16, bytecode: Vec<u8>) -> Self {
        Self {
            max_stack,
            max_locals,
            bytecode,
            decoded: OnceLock::new(),
        }
    }

    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    /// Decodes the instruction stream on first call and caches it. Failures are
    /// not cached.
    pub fn instructions(&self, pool: &ConstantPool) -> Result<&[Instruction]> {
        if let Some(decoded) = self.decoded.get() {
            return Ok(decoded);
        }
        let decoded = bytecode::decode(&self.bytecode, pool)?;
        Ok(self.decoded.get_or_init(|| decoded))
    }
}

fn skip_attributes(r: &mut ByteReader<'_>, what: &'static str) -> Result<()> {
    let count = r.read_u16().map_err(truncated(what))?;
    for _ in 0..count {
        r.skip(2).map_err(truncated(what))?;
        let length = r.read_u32().map_err(truncated(what))? as usize;
        r.skip(length).map_err(truncated(what))?;
    }
    Ok(())
}
