//! Helper for declaring integer-backed enums that can hold unrecognized values.
//!
//! Several of Tor's wire formats use small integers as type tags, only some
//! of whose values are currently assigned a meaning: cell commands,
//! certificate purposes, destroy-reasons, and so on. This crate provides
//! [`caret_int!`], which declares a newtype wrapping an integer, gives a
//! name to each of its known values, and accepts any other integer as an
//! "unrecognized" value of the same type, rather than failing to parse.

#![warn(missing_docs)]

/// Declare an integer type with some named elements.
///
/// This macro declares a struct that wraps an integer type, and allows any
/// integer value of that type, not just the ones that have been given
/// names. Unnamed values round-trip (`Display`/`From`) as their bare
/// integer.
///
/// # Examples
/// ```
/// use caret::caret_int;
/// caret_int! {
///     pub struct FruitId(u8) {
///         AVOCADO = 7,
///         PERSIMMON = 8,
///         LONGAN = 99
///     }
/// }
///
/// let a_num: u8 = FruitId::AVOCADO.into();
/// assert_eq!(a_num, 7);
/// let a_fruit: FruitId = 8.into();
/// assert_eq!(a_fruit, FruitId::PERSIMMON);
/// assert_eq!(format!("{}", FruitId::PERSIMMON), "PERSIMMON");
///
/// let weird_fruit: FruitId = 202.into();
/// assert_eq!(format!("{}", weird_fruit), "202");
/// ```
#[macro_export]
macro_rules! caret_int {
    {
       $(#[$meta:meta])*
       $v:vis struct $name:ident ( $numtype:ty ) {
           $(
               $(#[$item_meta:meta])*
               $id:ident = $num:literal
           ),*
           $(,)?
      }
    } => {
        #[derive(PartialEq, Eq, Copy, Clone, Hash)]
        $(#[$meta])*
        $v struct $name($numtype);

        impl From<$name> for $numtype {
            fn from(val: $name) -> $numtype { val.0 }
        }
        impl From<$numtype> for $name {
            fn from(num: $numtype) -> $name { $name(num) }
        }
        impl $name {
            $(
                $( #[$item_meta] )*
                pub const $id: $name = $name($num) ; )*

            /// Return the name of this value, if it is a recognized one.
            fn to_str(self) -> Option<&'static str> {
                match self {
                    $( $name::$id => Some(stringify!($id)), )*
                    _ => None,
                }
            }

            /// Return true if this value is one that we recognize.
            $v fn is_recognized(self) -> bool {
                match self {
                    $( $name::$id => true, )*
                    _ => false,
                }
            }

            /// Try to convert this value from one of the recognized names.
            $v fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( stringify!($id) => Some($name::$id), )*
                    _ => None,
                }
            }

            /// Return the underlying integer that this value represents.
            $v fn get(self) -> $numtype {
                self.into()
            }
        }
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self.to_str() {
                    Some(s) => write!(f, "{}", s),
                    None => write!(f, "{}", self.0),
                }
            }
        }
        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }
    };
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]

    caret_int! {
        #[derive(Ord, PartialOrd)]
        pub struct Color(u8) {
            RED = 1,
            GREEN = 2,
            BLUE = 3,
        }
    }

    #[test]
    fn recognized_roundtrip() {
        let c = Color::GREEN;
        let n: u8 = c.into();
        assert_eq!(n, 2);
        assert_eq!(Color::from(2), Color::GREEN);
        assert!(Color::GREEN.is_recognized());
        assert_eq!(Color::from_name("BLUE"), Some(Color::BLUE));
        assert_eq!(format!("{}", Color::RED), "RED");
    }

    #[test]
    fn unrecognized_value() {
        let c: Color = 200.into();
        assert!(!c.is_recognized());
        assert_eq!(c.get(), 200);
        assert_eq!(format!("{}", c), "200");
        assert_eq!(Color::from_name("PURPLE"), None);
    }
}
