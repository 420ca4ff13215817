//! Package-match scanning over decoded classes.
//!
//! Matching is a literal string-prefix test of the callee owner's type
//! signature (`Lcom/acme/Util;`) against the normalized package prefix. There is
//! no package-boundary check: `Lcom/acme` also matches `Lcom/acmeplus/Foo;`.

use serde::Serialize;
use std::fmt;

use crate::class_file::{ClassFile, MethodInfo};
use crate::error::{Diagnostic, Result, UnitKind};
use crate::member::MemberReference;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackagePrefix(String);

impl PackagePrefix {
    /// `com.acme` becomes `Lcom/acme`.
    pub fn from_package(package: &str) -> Self {
        Self(format!("L{}", package.trim().replace('.', "/")))
    }

    /// Takes a prefix already in signature form, e.g. `Lcom/acme/`.
    pub fn from_signature(signature: &str) -> Self {
        Self(signature.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Dotted package without the leading `L`, e.g. `com.acme`.
    pub fn dotted(&self) -> String {
        self.0
            .strip_prefix('L')
            .unwrap_or(&self.0)
            .replace('/', ".")
    }

    pub fn matches(&self, target: &MemberReference) -> bool {
        target.owner_signature().starts_with(self.0.as_str())
    }
}

impl fmt::Display for PackagePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// Also report `get`/`put` field instructions, not just calls.
    pub include_field_access: bool,
}

/// One call site: which method called which member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MatchResult {
    pub caller_class: String,
    pub caller: String,
    pub callee: String,
}

#[derive(Debug, Default)]
pub struct ClassScan {
    pub matches: Vec<MatchResult>,
    pub diagnostics: Vec<Diagnostic>,
    pub methods_scanned: usize,
}

/// Scans one method. Abstract and native methods have no code and yield
/// nothing.
pub fn scan_method(
    class: &ClassFile,
    method: &MethodInfo,
    prefix: &PackagePrefix,
    options: ScanOptions,
) -> Result<Vec<MatchResult>> {
    let Some(code) = method.code()? else {
        return Ok(Vec::new());
    };

    let mut matches = Vec::new();
    let mut caller: Option<String> = None;
    for instruction in code.instructions(class.constant_pool())? {
        let Some(target) = instruction.target() else {
            continue;
        };
        if !instruction.is_call() && !options.include_field_access {
            continue;
        }
        if !prefix.matches(target) {
            continue;
        }
        let caller = caller.get_or_insert_with(|| method.identity(class));
        matches.push(MatchResult {
            caller_class: class.dotted_name(),
            caller: caller.clone(),
            callee: target.to_string(),
        });
    }
    Ok(matches)
}

/// Scans every method of `class`. A method whose code fails to decode is
/// recorded as a diagnostic and contributes no matches; its siblings are still
/// scanned.
pub fn scan_class(class: &ClassFile, prefix: &PackagePrefix, options: ScanOptions) -> ClassScan {
    let mut scan = ClassScan::default();
    for method in class.methods() {
        scan.methods_scanned += 1;
        match scan_method(class, method, prefix, options) {
            Ok(matches) => scan.matches.extend(matches),
            Err(e) => scan
                .diagnostics
                .push(Diagnostic::new(UnitKind::Method, method.identity(class), &e)),
        }
    }
    scan
}
