//! # Configurable Objects
//!
//! [`Object`] is the reflective surface the factory and components rely on.
//! A type describes each name it understands through [`Member`] and
//! performs reads and writes in [`Object::get_member`] and
//! [`Object::set_member`].
//!
//! [`configure`] applies a configuration to a plain object:
//!
//! 1. a name that is both a field and a setter is ambiguous,
//! 2. a setter is called,
//! 3. a plain method may not be overridden,
//! 4. an unknown name is rejected,
//! 5. a field is assigned, deep-merging when both the current and the
//!    incoming value are maps.

use crate::{
    error::{ConfigError, JiiError, PropertyError},
    identity::Identifiable,
    value::{CLASS_NAME_KEY, Config, Value, merge_into},
};

/// What an [`Object`] exposes under a name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Member {
    /// A public field.
    pub field: bool,
    /// A `getName`-style accessor.
    pub getter: bool,
    /// A `setName`-style accessor.
    pub setter: bool,
    /// A plain method.
    pub method: bool,
}

impl Member {
    /// Nothing under this name.
    pub const NONE: Member = Member {
        field: false,
        getter: false,
        setter: false,
        method: false,
    };
    /// A public field.
    pub const FIELD: Member = Member {
        field: true,
        ..Self::NONE
    };
    /// A getter without a setter.
    pub const READ_ONLY: Member = Member {
        getter: true,
        ..Self::NONE
    };
    /// A setter without a getter.
    pub const WRITE_ONLY: Member = Member {
        setter: true,
        ..Self::NONE
    };
    /// A getter and a setter.
    pub const ACCESSOR: Member = Member {
        getter: true,
        setter: true,
        ..Self::NONE
    };
    /// A plain method.
    pub const METHOD: Member = Member {
        method: true,
        ..Self::NONE
    };

    /// Whether anything exists under this name.
    pub fn exists(&self) -> bool {
        self.field || self.getter || self.setter || self.method
    }

    /// Whether the name can be read.
    pub fn readable(&self) -> bool {
        self.field || self.getter
    }

    /// Whether the name can be written.
    pub fn writable(&self) -> bool {
        self.field || self.setter
    }
}

/// A type whose members can be read and written by name.
pub trait Object: Identifiable {
    /// Describe the member called `name`.
    fn member(&self, name: &str) -> Member {
        let _ = name;
        Member::NONE
    }

    /// Write a field or call a setter.
    fn set_member(&mut self, name: &str, value: Value) -> Result<(), JiiError> {
        let _ = value;
        Err(PropertyError::unknown(self.type_name(), name).into())
    }

    /// Read a field or call a getter.
    fn get_member(&self, name: &str) -> Result<Value, JiiError> {
        Err(PropertyError::unknown(self.type_name(), name).into())
    }
}

/// Assign a field, deep-merging map values into a map-valued field.
pub(crate) fn assign_field<O>(target: &mut O, name: &str, value: Value) -> Result<(), JiiError>
where
    O: Object + ?Sized,
{
    if let Value::Map(incoming) = &value {
        if let Ok(Value::Map(mut current)) = target.get_member(name) {
            merge_into(&mut current, incoming);
            return target.set_member(name, Value::Map(current));
        }
    }
    target.set_member(name, value)
}

fn ambiguous(type_name: &str, property: &str) -> ConfigError {
    ConfigError::Ambiguous {
        type_name: type_name.to_string(),
        property: property.to_string(),
    }
}

pub(crate) fn check_ambiguity(type_name: &str, property: &str, member: Member) -> Result<(), ConfigError> {
    if member.field && member.setter {
        return Err(ambiguous(type_name, property));
    }
    Ok(())
}

/// Apply `config` to a plain object.
pub fn configure<O>(target: &mut O, config: Config) -> Result<(), JiiError>
where
    O: Object + ?Sized,
{
    for (key, value) in config {
        if key == CLASS_NAME_KEY {
            continue;
        }
        let member = target.member(&key);
        check_ambiguity(target.type_name(), &key, member)?;

        if member.setter {
            target.set_member(&key, value)?;
        } else if member.method {
            return Err(ConfigError::MethodOverride {
                type_name: target.type_name().to_string(),
                property: key,
            }
            .into());
        } else if !member.field {
            return Err(ConfigError::UnknownKey {
                type_name: target.type_name().to_string(),
                property: key,
            }
            .into());
        } else {
            assign_field(target, &key, value)?;
        }
    }
    Ok(())
}
