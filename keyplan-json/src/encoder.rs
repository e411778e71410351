use core::fmt::Write;

use keyplan_format::{EncodeError, StructuredEncoder};
use keyplan_value::{Value, write_escaped_str, write_number};

use crate::{JsonOptions, trace};

#[derive(Debug, Clone, Copy)]
enum Ctx {
    Keyed { first: bool, pending: bool },
    Seq { first: bool },
}

/// Streams encoder calls out as JSON text.
#[derive(Debug, Default)]
pub struct JsonEncoder {
    out: String,
    stack: Vec<Ctx>,
    options: JsonOptions,
    done: bool,
}

impl JsonEncoder {
    /// An encoder producing compact output.
    pub fn new() -> Self {
        Self::default()
    }

    /// An encoder with the given formatting options.
    pub fn with_options(options: JsonOptions) -> Self {
        Self {
            out: String::new(),
            stack: Vec::new(),
            options,
            done: false,
        }
    }

    /// The finished text.
    pub fn finish(self) -> Result<String, EncodeError> {
        if !self.stack.is_empty() {
            return Err(EncodeError::sink(format!(
                "{} container(s) left open",
                self.stack.len()
            )));
        }
        if !self.done {
            return Err(EncodeError::sink("nothing was encoded"));
        }
        trace!("encoded {} bytes of JSON", self.out.len());
        Ok(self.out)
    }

    fn write_indent(&mut self) {
        if self.options.pretty {
            self.out.push('\n');
            for _ in 0..self.stack.len() {
                self.out.push_str(self.options.indent);
            }
        }
    }

    /// Places separators before a value or container opening.
    fn before_value(&mut self) -> Result<(), EncodeError> {
        match self.stack.last_mut() {
            Some(Ctx::Seq { first }) => {
                if !*first {
                    self.out.push(',');
                }
                *first = false;
                self.write_indent();
            }
            Some(Ctx::Keyed { pending, .. }) => {
                if !*pending {
                    return Err(EncodeError::sink("value written without a key"));
                }
                *pending = false;
            }
            None => {
                if self.done {
                    return Err(EncodeError::sink("more than one top-level value"));
                }
            }
        }
        Ok(())
    }

    fn after_value(&mut self) {
        if self.stack.is_empty() {
            self.done = true;
        }
    }

    fn close(&mut self, first: bool, bracket: char) {
        if !first {
            self.write_indent();
        }
        self.out.push(bracket);
        self.after_value();
    }
}

impl StructuredEncoder for JsonEncoder {
    fn begin_keyed(&mut self) -> Result<(), EncodeError> {
        self.before_value()?;
        self.out.push('{');
        self.stack.push(Ctx::Keyed {
            first: true,
            pending: false,
        });
        Ok(())
    }

    fn key(&mut self, key: &str) -> Result<(), EncodeError> {
        let Some(Ctx::Keyed { first, pending }) = self.stack.last_mut() else {
            return Err(EncodeError::sink("key written outside an object"));
        };
        if *pending {
            return Err(EncodeError::sink(format!("key `{key}` follows a key")));
        }
        if !*first {
            self.out.push(',');
        }
        *first = false;
        *pending = true;
        self.write_indent();
        write_escaped_str(&mut self.out, key)?;
        self.out.push(':');
        if self.options.pretty {
            self.out.push(' ');
        }
        Ok(())
    }

    fn end_keyed(&mut self) -> Result<(), EncodeError> {
        match self.stack.pop() {
            Some(Ctx::Keyed {
                first,
                pending: false,
            }) => {
                self.close(first, '}');
                Ok(())
            }
            Some(Ctx::Keyed { pending: true, .. }) => {
                Err(EncodeError::sink("object closed after a key with no value"))
            }
            _ => Err(EncodeError::sink("end_keyed without a matching begin_keyed")),
        }
    }

    fn begin_sequence(&mut self) -> Result<(), EncodeError> {
        self.before_value()?;
        self.out.push('[');
        self.stack.push(Ctx::Seq { first: true });
        Ok(())
    }

    fn end_sequence(&mut self) -> Result<(), EncodeError> {
        match self.stack.pop() {
            Some(Ctx::Seq { first }) => {
                self.close(first, ']');
                Ok(())
            }
            _ => Err(EncodeError::sink(
                "end_sequence without a matching begin_sequence",
            )),
        }
    }

    fn value(&mut self, value: &Value) -> Result<(), EncodeError> {
        match value {
            Value::Array(items) => {
                self.begin_sequence()?;
                for item in items {
                    self.value(item)?;
                }
                self.end_sequence()
            }
            Value::Object(object) => {
                self.begin_keyed()?;
                for (key, item) in object {
                    self.key(key)?;
                    self.value(item)?;
                }
                self.end_keyed()
            }
            scalar => {
                self.before_value()?;
                match scalar {
                    Value::Null => self.out.push_str("null"),
                    Value::Bool(b) => write!(self.out, "{b}")?,
                    Value::Number(n) => write_number(&mut self.out, n)?,
                    Value::String(s) => write_escaped_str(&mut self.out, s)?,
                    Value::Array(_) | Value::Object(_) => {}
                }
                self.after_value();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyplan_value::value;

    fn write(options: JsonOptions, value: &Value) -> String {
        let mut encoder = JsonEncoder::with_options(options);
        encoder.value(value).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn compact_output_matches_the_value_display() {
        let v = value!({"a": [1, 2.5, null], "b": {}, "c": "q\"t", "d": []});
        assert_eq!(write(JsonOptions::new(), &v), v.to_string());
    }

    #[test]
    fn pretty_output() {
        let v = value!({"a": [1, 2], "b": {}, "c": {"d": true}});
        insta::assert_snapshot!(write(JsonOptions::new().pretty(), &v), @r#"
        {
          "a": [
            1,
            2
          ],
          "b": {},
          "c": {
            "d": true
          }
        }
        "#);
        assert_eq!(
            write(JsonOptions::new().indent("\t"), &value!({"x": 1})),
            "{\n\t\"x\": 1\n}"
        );
    }

    #[test]
    fn misuse_is_reported() {
        let mut encoder = JsonEncoder::new();
        encoder.begin_keyed().unwrap();
        assert!(encoder.value(&value!(1)).is_err());

        let mut encoder = JsonEncoder::new();
        encoder.begin_keyed().unwrap();
        encoder.key("a").unwrap();
        assert!(encoder.end_keyed().is_err());

        let mut encoder = JsonEncoder::new();
        encoder.value(&value!(1)).unwrap();
        assert!(encoder.value(&value!(2)).is_err());

        assert!(JsonEncoder::new().finish().is_err());
        assert!(JsonEncoder::new().key("a").is_err());
    }
}
