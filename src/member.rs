use serde::Serialize;
use std::borrow::Cow;
use std::fmt;

/// A resolved field or method reference: owner internal name, member name and
/// descriptor. Immutable once resolved from the constant pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MemberReference {
    owner: String,
    name: String,
    descriptor: String,
}

impl MemberReference {
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }

    /// Owner internal name as stored in the pool, e.g. `com/acme/Util`.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Owner as a type signature: `Lcom/acme/Util;` for classes, the array
    /// descriptor unchanged for array owners.
    pub fn owner_signature(&self) -> Cow<'_, str> {
        if self.owner.starts_with('[') {
            Cow::Borrowed(&self.owner)
        } else {
            Cow::Owned(format!("L{};", self.owner))
        }
    }
}

/// `com.acme.Util.run()V`
impl fmt::Display for MemberReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}{}",
            dotted(&self.owner),
            self.name,
            self.descriptor
        )
    }
}

/// Converts an internal name (`com/acme/Util`) to its dotted form.
pub fn dotted(internal_name: &str) -> String {
    internal_name.replace('/', ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_signature_wraps_class_names() {
        let m = MemberReference::new("com/acme/Util", "run", "()V");
        assert_eq!(m.owner_signature(), "Lcom/acme/Util;");
        assert_eq!(m.to_string(), "com.acme.Util.run()V");
    }

    #[test]
    fn owner_signature_keeps_array_descriptors() {
        let m = MemberReference::new("[Ljava/lang/Object;", "clone", "()Ljava/lang/Object;");
        assert_eq!(m.owner_signature(), "[Ljava/lang/Object;");
    }
}
