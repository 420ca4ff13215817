//! Minimal class-file assembler for tests. Std-only so integration tests can
//! pull it in with `#[path]`.
#![allow(dead_code)]

use std::collections::HashMap;

pub mod op {
    pub const NOP: u8 = 0x00;
    pub const ICONST_0: u8 = 0x03;
    pub const BIPUSH: u8 = 0x10;
    pub const SIPUSH: u8 = 0x11;
    pub const LDC: u8 = 0x12;
    pub const ILOAD: u8 = 0x15;
    pub const ALOAD_0: u8 = 0x2a;
    pub const ISTORE: u8 = 0x36;
    pub const POP: u8 = 0x57;
    pub const IINC: u8 = 0x84;
    pub const IFEQ: u8 = 0x99;
    pub const GOTO: u8 = 0xa7;
    pub const RET: u8 = 0xa9;
    pub const TABLESWITCH: u8 = 0xaa;
    pub const LOOKUPSWITCH: u8 = 0xab;
    pub const IRETURN: u8 = 0xac;
    pub const RETURN: u8 = 0xb1;
    pub const GETSTATIC: u8 = 0xb2;
    pub const GETFIELD: u8 = 0xb4;
    pub const INVOKEVIRTUAL: u8 = 0xb6;
    pub const INVOKESPECIAL: u8 = 0xb7;
    pub const INVOKESTATIC: u8 = 0xb8;
    pub const INVOKEINTERFACE: u8 = 0xb9;
    pub const INVOKEDYNAMIC: u8 = 0xba;
    pub const NEW: u8 = 0xbb;
    pub const WIDE: u8 = 0xc4;
    pub const MULTIANEWARRAY: u8 = 0xc5;
    pub const GOTO_W: u8 = 0xc8;

    fn with_index(opcode: u8, index: u16) -> Vec<u8> {
        let [hi, lo] = index.to_be_bytes();
        vec![opcode, hi, lo]
    }

    pub fn invokevirtual(index: u16) -> Vec<u8> {
        with_index(INVOKEVIRTUAL, index)
    }

    pub fn invokespecial(index: u16) -> Vec<u8> {
        with_index(INVOKESPECIAL, index)
    }

    pub fn invokestatic(index: u16) -> Vec<u8> {
        with_index(INVOKESTATIC, index)
    }

    pub fn getstatic(index: u16) -> Vec<u8> {
        with_index(GETSTATIC, index)
    }

    pub fn invokeinterface(index: u16, count: u8) -> Vec<u8> {
        let mut out = with_index(INVOKEINTERFACE, index);
        out.extend_from_slice(&[count, 0]);
        out
    }

    pub fn invokedynamic(index: u16) -> Vec<u8> {
        let mut out = with_index(INVOKEDYNAMIC, index);
        out.extend_from_slice(&[0, 0]);
        out
    }

    /// `tableswitch` placed at `address`, with one jump offset per case.
    pub fn tableswitch(address: usize, low: i32, high: i32) -> Vec<u8> {
        let mut out = vec![TABLESWITCH];
        out.resize(1 + (4 - (address + 1) % 4) % 4, 0);
        for v in [0i32, low, high] {
            out.extend_from_slice(&v.to_be_bytes());
        }
        let cases = (high as i64 - low as i64 + 1).max(0);
        for _ in 0..cases {
            out.extend_from_slice(&0i32.to_be_bytes());
        }
        out
    }

    /// `lookupswitch` placed at `address` with `pairs` match/offset pairs.
    pub fn lookupswitch(address: usize, pairs: i32) -> Vec<u8> {
        let mut out = vec![LOOKUPSWITCH];
        out.resize(1 + (4 - (address + 1) % 4) % 4, 0);
        out.extend_from_slice(&0i32.to_be_bytes());
        out.extend_from_slice(&pairs.to_be_bytes());
        for key in 0..pairs.max(0) {
            out.extend_from_slice(&key.to_be_bytes());
            out.extend_from_slice(&0i32.to_be_bytes());
        }
        out
    }
}

pub struct ClassBuilder {
    pool: Vec<u8>,
    next_index: u16,
    utf8_cache: HashMap<String, u16>,
    class_cache: HashMap<String, u16>,
    major: u16,
    minor: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<u8>,
    fields_count: u16,
    methods: Vec<u8>,
    methods_count: u16,
}

impl ClassBuilder {
    pub fn new(name: &str) -> Self {
        let mut b = Self {
            pool: Vec::new(),
            next_index: 1,
            utf8_cache: HashMap::new(),
            class_cache: HashMap::new(),
            major: 52,
            minor: 0,
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            fields_count: 0,
            methods: Vec::new(),
            methods_count: 0,
        };
        b.this_class = b.class(name);
        b.super_class = b.class("java/lang/Object");
        b
    }

    pub fn version(&mut self, major: u16, minor: u16) -> &mut Self {
        self.major = major;
        self.minor = minor;
        self
    }

    fn push_entry(&mut self, bytes: &[u8], slots: u16) -> u16 {
        let index = self.next_index;
        self.pool.extend_from_slice(bytes);
        self.next_index += slots;
        index
    }

    pub fn utf8(&mut self, s: &str) -> u16 {
        if let Some(index) = self.utf8_cache.get(s) {
            return *index;
        }
        let mut bytes = vec![1u8];
        bytes.extend_from_slice(&(s.len() as u16).to_be_bytes());
        bytes.extend_from_slice(s.as_bytes());
        let index = self.push_entry(&bytes, 1);
        self.utf8_cache.insert(s.to_string(), index);
        index
    }

    pub fn class(&mut self, name: &str) -> u16 {
        if let Some(index) = self.class_cache.get(name) {
            return *index;
        }
        let name_index = self.utf8(name);
        let mut bytes = vec![7u8];
        bytes.extend_from_slice(&name_index.to_be_bytes());
        let index = self.push_entry(&bytes, 1);
        self.class_cache.insert(name.to_string(), index);
        index
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let mut bytes = vec![12u8];
        bytes.extend_from_slice(&name_index.to_be_bytes());
        bytes.extend_from_slice(&descriptor_index.to_be_bytes());
        self.push_entry(&bytes, 1)
    }

    fn reference(&mut self, tag: u8, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(owner);
        let nat_index = self.name_and_type(name, descriptor);
        let mut bytes = vec![tag];
        bytes.extend_from_slice(&class_index.to_be_bytes());
        bytes.extend_from_slice(&nat_index.to_be_bytes());
        self.push_entry(&bytes, 1)
    }

    pub fn field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        self.reference(9, owner, name, descriptor)
    }

    pub fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        self.reference(10, owner, name, descriptor)
    }

    pub fn interface_method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        self.reference(11, owner, name, descriptor)
    }

    pub fn long(&mut self, value: i64) -> u16 {
        let mut bytes = vec![5u8];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.push_entry(&bytes, 2)
    }

    pub fn invoke_dynamic(&mut self, bootstrap: u16, name: &str, descriptor: &str) -> u16 {
        let nat_index = self.name_and_type(name, descriptor);
        let mut bytes = vec![18u8];
        bytes.extend_from_slice(&bootstrap.to_be_bytes());
        bytes.extend_from_slice(&nat_index.to_be_bytes());
        self.push_entry(&bytes, 1)
    }

    pub fn interface(&mut self, name: &str) -> &mut Self {
        let index = self.class(name);
        self.interfaces.push(index);
        self
    }

    pub fn field(&mut self, name: &str, descriptor: &str) -> &mut Self {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let signature = self.utf8("Signature");
        self.fields.extend_from_slice(&0x0002u16.to_be_bytes());
        self.fields.extend_from_slice(&name_index.to_be_bytes());
        self.fields.extend_from_slice(&descriptor_index.to_be_bytes());
        // One attribute to exercise the skip path.
        self.fields.extend_from_slice(&1u16.to_be_bytes());
        self.fields.extend_from_slice(&signature.to_be_bytes());
        self.fields.extend_from_slice(&2u32.to_be_bytes());
        self.fields.extend_from_slice(&descriptor_index.to_be_bytes());
        self.fields_count += 1;
        self
    }

    /// Adds a method; `code` holds the raw instruction bytes, `None` makes it
    /// abstract.
    pub fn method(&mut self, name: &str, descriptor: &str, code: Option<Vec<u8>>) -> &mut Self {
        let body = code.map(|code| code_attribute_body(&code));
        self.method_with_code_body(name, descriptor, body)
    }

    /// Adds a method whose `Code` attribute body is used verbatim.
    pub fn method_with_code_body(
        &mut self,
        name: &str,
        descriptor: &str,
        body: Option<Vec<u8>>,
    ) -> &mut Self {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let flags: u16 = if body.is_some() { 0x0001 } else { 0x0401 };
        self.methods.extend_from_slice(&flags.to_be_bytes());
        self.methods.extend_from_slice(&name_index.to_be_bytes());
        self.methods.extend_from_slice(&descriptor_index.to_be_bytes());
        match body {
            Some(body) => {
                let code_name = self.utf8("Code");
                self.methods.extend_from_slice(&1u16.to_be_bytes());
                self.methods.extend_from_slice(&code_name.to_be_bytes());
                self.methods
                    .extend_from_slice(&(body.len() as u32).to_be_bytes());
                self.methods.extend_from_slice(&body);
            }
            None => self.methods.extend_from_slice(&0u16.to_be_bytes()),
        }
        self.methods_count += 1;
        self
    }

    pub fn build(&mut self) -> Vec<u8> {
        let source_file = self.utf8("SourceFile");
        let source_name = self.utf8("Generated.java");

        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
        out.extend_from_slice(&self.minor.to_be_bytes());
        out.extend_from_slice(&self.major.to_be_bytes());
        out.extend_from_slice(&self.next_index.to_be_bytes());
        out.extend_from_slice(&self.pool);
        out.extend_from_slice(&0x0021u16.to_be_bytes());
        out.extend_from_slice(&self.this_class.to_be_bytes());
        out.extend_from_slice(&self.super_class.to_be_bytes());
        out.extend_from_slice(&(self.interfaces.len() as u16).to_be_bytes());
        for index in &self.interfaces {
            out.extend_from_slice(&index.to_be_bytes());
        }
        out.extend_from_slice(&self.fields_count.to_be_bytes());
        out.extend_from_slice(&self.fields);
        out.extend_from_slice(&self.methods_count.to_be_bytes());
        out.extend_from_slice(&self.methods);
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&source_file.to_be_bytes());
        out.extend_from_slice(&2u32.to_be_bytes());
        out.extend_from_slice(&source_name.to_be_bytes());
        out
    }
}

/// `Code` attribute body around `code`: max_stack/max_locals, one exception
/// table entry and no nested attributes.
pub fn code_attribute_body(code: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&4u16.to_be_bytes());
    body.extend_from_slice(&4u16.to_be_bytes());
    body.extend_from_slice(&(code.len() as u32).to_be_bytes());
    body.extend_from_slice(code);
    body.extend_from_slice(&1u16.to_be_bytes());
    body.extend_from_slice(&[0u8; 8]);
    body.extend_from_slice(&0u16.to_be_bytes());
    body
}

/// One entry of a hand-assembled, stored-only zip.
pub struct RawZipEntry<'a> {
    pub name: &'a str,
    pub data: &'a [u8],
    pub crc32: u32,
    /// Uncompressed size announced through a zip64 extra field in the central
    /// directory instead of the real length.
    pub declared_size: Option<u64>,
}

/// Builds a zip by hand so tests can make its headers disagree with its data.
pub fn raw_zip(entries: &[RawZipEntry<'_>]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut central = Vec::new();

    for entry in entries {
        let offset = out.len() as u32;
        let len = entry.data.len() as u32;
        let version: u16 = if entry.declared_size.is_some() { 45 } else { 20 };

        out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        out.extend_from_slice(&version.to_le_bytes());
        out.extend_from_slice(&[0u8; 6]); // flags, method (stored), time
        out.extend_from_slice(&0u16.to_le_bytes()); // date
        out.extend_from_slice(&entry.crc32.to_le_bytes());
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(entry.name.as_bytes());
        out.extend_from_slice(entry.data);

        let mut extra = Vec::new();
        let uncompressed = match entry.declared_size {
            Some(size) => {
                extra.extend_from_slice(&0x0001u16.to_le_bytes());
                extra.extend_from_slice(&8u16.to_le_bytes());
                extra.extend_from_slice(&size.to_le_bytes());
                u32::MAX
            }
            None => len,
        };
        central.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        central.extend_from_slice(&version.to_le_bytes());
        central.extend_from_slice(&version.to_le_bytes());
        central.extend_from_slice(&[0u8; 8]); // flags, method, time, date
        central.extend_from_slice(&entry.crc32.to_le_bytes());
        central.extend_from_slice(&len.to_le_bytes());
        central.extend_from_slice(&uncompressed.to_le_bytes());
        central.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
        central.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        central.extend_from_slice(&[0u8; 10]); // comment, disk, attributes
        central.extend_from_slice(&offset.to_le_bytes());
        central.extend_from_slice(entry.name.as_bytes());
        central.extend_from_slice(&extra);
    }

    let central_offset = out.len() as u32;
    out.extend_from_slice(&central);
    out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
    out.extend_from_slice(&[0u8; 4]);
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&(central.len() as u32).to_le_bytes());
    out.extend_from_slice(&central_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}
