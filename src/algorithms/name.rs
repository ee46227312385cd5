//! Parser for composed algorithm names such as `EMSA4(SHA-256,MGF1,32)`.

use alloc::{string::String, vec::Vec};
use core::{fmt, str::FromStr};

use crate::errors::{Error, Result};

/// An algorithm name with its parenthesized arguments.
///
/// Arguments may themselves be composed names, `OAEP(SHA-256,MGF1(SHA-1))`
/// has the two arguments `SHA-256` and `MGF1(SHA-1)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SchemeName {
    name: String,
    args: Vec<String>,
}

impl SchemeName {
    /// Parses `Name` or `Name(arg1,arg2,...)`.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        let bad = || Error::decoding(alloc::format!("invalid algorithm name '{}'", spec));

        let open = match spec.find('(') {
            Some(i) => i,
            None => {
                if spec.is_empty() || spec.contains([')', ',']) {
                    return Err(bad());
                }
                return Ok(SchemeName {
                    name: spec.into(),
                    args: Vec::new(),
                });
            }
        };

        let name = spec[..open].trim();
        if name.is_empty() || !spec.ends_with(')') {
            return Err(bad());
        }

        let inner = &spec[open + 1..spec.len() - 1];
        let mut args = Vec::new();
        let mut depth = 0usize;
        let mut start = 0;
        for (i, c) in inner.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => depth = depth.checked_sub(1).ok_or_else(bad)?,
                ',' if depth == 0 => {
                    args.push(inner[start..i].trim());
                    start = i + 1;
                }
                _ => {}
            }
        }
        if depth != 0 {
            return Err(bad());
        }
        args.push(inner[start..].trim());

        if args.iter().any(|a| a.is_empty()) {
            return Err(bad());
        }

        Ok(SchemeName {
            name: name.into(),
            args: args.into_iter().map(String::from).collect(),
        })
    }

    /// The outermost name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All arguments, in order.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Number of arguments.
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// The `i`-th argument, if present.
    pub fn arg(&self, i: usize) -> Option<&str> {
        self.args.get(i).map(String::as_str)
    }

    /// The `i`-th argument parsed as an integer, or `default` if absent.
    pub fn arg_as_usize(&self, i: usize, default: usize) -> Result<usize> {
        match self.arg(i) {
            None => Ok(default),
            Some(a) => a
                .parse()
                .map_err(|_| Error::decoding(alloc::format!("expected an integer, got '{}'", a))),
        }
    }
}

/// Fails with [`Error::AlgorithmNotFound`] unless the outermost name of
/// `padding` is one of `allowed`.
pub(crate) fn require_padding(algo: &str, padding: &str, allowed: &[&str]) -> Result<()> {
    let req = SchemeName::parse(padding)?;
    if allowed.contains(&req.name()) {
        Ok(())
    } else {
        Err(Error::not_found(alloc::format!("{}/{}", algo, padding)))
    }
}

impl FromStr for SchemeName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SchemeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            f.write_str("(")?;
            for (i, a) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                f.write_str(a)?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_parse() {
        let n = SchemeName::parse("SHA-256").unwrap();
        assert_eq!(n.name(), "SHA-256");
        assert_eq!(n.arg_count(), 0);

        let n = SchemeName::parse("EMSA4(SHA-256,MGF1,32)").unwrap();
        assert_eq!(n.name(), "EMSA4");
        assert_eq!(n.args(), ["SHA-256", "MGF1", "32"]);
        assert_eq!(n.arg_as_usize(2, 0).unwrap(), 32);
        assert_eq!(n.arg_as_usize(3, 7).unwrap(), 7);
        assert!(n.arg_as_usize(0, 0).is_err());

        let n = SchemeName::parse("OAEP(SHA-256, MGF1(SHA-1))").unwrap();
        assert_eq!(n.args(), ["SHA-256", "MGF1(SHA-1)"]);
        assert_eq!(n.to_string(), "OAEP(SHA-256,MGF1(SHA-1))");
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["", "()", "EMSA1(", "EMSA1(SHA-1", "EMSA1)", "X(a,,b)", "X(a))", "a,b"] {
            assert!(
                matches!(SchemeName::parse(bad), Err(Error::Decoding(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_require_padding() {
        assert!(require_padding("DSA", "EMSA1(SHA-256)", &["EMSA1", "Raw"]).is_ok());
        assert_eq!(
            require_padding("DSA", "EMSA3(SHA-256)", &["EMSA1", "Raw"]),
            Err(Error::AlgorithmNotFound("DSA/EMSA3(SHA-256)".into()))
        );
    }
}
