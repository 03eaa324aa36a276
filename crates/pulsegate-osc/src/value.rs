//! Coercion of OSC arguments into plain values
//!
//! Avatar parameters arrive as floats, ints or bools depending on how the
//! parameter is declared, so handlers accept any numeric-looking argument.

use rosc::OscType;

/// Interpret an argument as an intensity value
pub fn as_f32(arg: &OscType) -> Option<f32> {
    match arg {
        OscType::Float(v) => Some(*v),
        OscType::Double(v) => Some(*v as f32),
        OscType::Int(v) => Some(*v as f32),
        OscType::Long(v) => Some(*v as f32),
        OscType::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Interpret an argument as a boolean-like switch value
pub fn as_bool(arg: &OscType) -> Option<bool> {
    match arg {
        OscType::Bool(v) => Some(*v),
        OscType::Int(v) => Some(*v != 0),
        OscType::Long(v) => Some(*v != 0),
        OscType::Float(v) => Some(*v != 0.0),
        OscType::Double(v) => Some(*v != 0.0),
        OscType::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" | "1" => Some(true),
            "false" | "off" | "no" | "0" | "" => Some(false),
            _ => None,
        },
        OscType::Nil => Some(false),
        OscType::Inf => Some(true),
        _ => None,
    }
}

/// First argument of a message as an intensity value
pub fn first_f32(args: &[OscType]) -> Option<f32> {
    args.first().and_then(as_f32)
}

/// First argument of a message as a switch value
pub fn first_bool(args: &[OscType]) -> Option<bool> {
    args.first().and_then(as_bool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_f32() {
        assert_eq!(as_f32(&OscType::Float(0.25)), Some(0.25));
        assert_eq!(as_f32(&OscType::Double(0.5)), Some(0.5));
        assert_eq!(as_f32(&OscType::Int(1)), Some(1.0));
        assert_eq!(as_f32(&OscType::Bool(true)), Some(1.0));
        assert_eq!(as_f32(&OscType::Bool(false)), Some(0.0));
        assert_eq!(as_f32(&OscType::String("0.5".to_string())), None);
        assert_eq!(as_f32(&OscType::Nil), None);
    }

    #[test]
    fn test_as_bool() {
        assert_eq!(as_bool(&OscType::Bool(true)), Some(true));
        assert_eq!(as_bool(&OscType::Int(0)), Some(false));
        assert_eq!(as_bool(&OscType::Int(2)), Some(true));
        assert_eq!(as_bool(&OscType::Float(0.0)), Some(false));
        assert_eq!(as_bool(&OscType::Float(0.1)), Some(true));
        assert_eq!(as_bool(&OscType::String("On".to_string())), Some(true));
        assert_eq!(as_bool(&OscType::String("false".to_string())), Some(false));
        assert_eq!(as_bool(&OscType::String("maybe".to_string())), None);
        assert_eq!(as_bool(&OscType::Blob(vec![1])), None);
    }

    #[test]
    fn test_first_argument() {
        assert_eq!(first_f32(&[]), None);
        assert_eq!(
            first_f32(&[OscType::Float(0.7), OscType::Float(0.1)]),
            Some(0.7)
        );
        assert_eq!(first_bool(&[OscType::Int(1)]), Some(true));
    }
}
