//! String functions, mounted as `text.*`.

use calcscript_core::{ArgMeta, CalcError, FnContext, FunctionMeta, FunctionPlugin, Value};

use crate::helpers::{list_arg, text_arg};

static ONE_STRING: [ArgMeta; 1] = [ArgMeta::required("s", "string", "Input text")];

/// upper(s)
pub struct Upper;

impl FunctionPlugin for Upper {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "upper",
            namespace: "text",
            usage: "upper(s)",
            description: "Uppercase the text",
            args: &ONE_STRING,
            returns: "string",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("upper", "1", args.len()));
        }
        Ok(Value::Text(text_arg(args, 0, "upper", "s")?.to_uppercase()))
    }
}

/// lower(s)
pub struct Lower;

impl FunctionPlugin for Lower {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "lower",
            namespace: "text",
            usage: "lower(s)",
            description: "Lowercase the text",
            args: &ONE_STRING,
            returns: "string",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("lower", "1", args.len()));
        }
        Ok(Value::Text(text_arg(args, 0, "lower", "s")?.to_lowercase()))
    }
}

/// trim(s)
pub struct Trim;

impl FunctionPlugin for Trim {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "trim",
            namespace: "text",
            usage: "trim(s)",
            description: "Strip leading and trailing whitespace",
            args: &ONE_STRING,
            returns: "string",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("trim", "1", args.len()));
        }
        Ok(Value::Text(text_arg(args, 0, "trim", "s")?.trim().to_string()))
    }
}

/// len(s) - character count, not byte count
pub struct Len;

impl FunctionPlugin for Len {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "len",
            namespace: "text",
            usage: "len(s)",
            description: "Number of characters",
            args: &ONE_STRING,
            returns: "number",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 1 {
            return Err(CalcError::arg_count("len", "1", args.len()));
        }
        let s = text_arg(args, 0, "len", "s")?;
        Ok(Value::Number(s.chars().count() as f64))
    }
}

/// join(list, sep) - stringify scalars and glue them together
pub struct Join;

static JOIN_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("list", "list", "Scalar values to join"),
    ArgMeta::required("sep", "string", "Separator between elements"),
];

impl FunctionPlugin for Join {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "join",
            namespace: "text",
            usage: "join(list, sep)",
            description: "Concatenate scalar elements with a separator",
            args: &JOIN_ARGS,
            returns: "string",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 2 {
            return Err(CalcError::arg_count("join", "2", args.len()));
        }
        let items = list_arg(args, 0, "join", "list")?;
        let sep = text_arg(args, 1, "join", "sep")?;
        let mut parts = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            match item {
                Value::Number(_)
                | Value::Text(_)
                | Value::Bool(_)
                | Value::Date(_)
                | Value::DateTime(_) => parts.push(item.to_string()),
                other => {
                    return Err(CalcError::eval(format!(
                        "join 'list'[{}]: expected a scalar, got {}",
                        i,
                        other.type_name()
                    )))
                }
            }
        }
        Ok(Value::Text(parts.join(&sep)))
    }
}

/// replace(s, from, to) - replace every occurrence
pub struct Replace;

static REPLACE_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("s", "string", "Input text"),
    ArgMeta::required("from", "string", "Substring to replace (non-empty)"),
    ArgMeta::required("to", "string", "Replacement"),
];

impl FunctionPlugin for Replace {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "replace",
            namespace: "text",
            usage: "replace(s, from, to)",
            description: "Replace every occurrence of a substring",
            args: &REPLACE_ARGS,
            returns: "string",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 3 {
            return Err(CalcError::arg_count("replace", "3", args.len()));
        }
        let s = text_arg(args, 0, "replace", "s")?;
        let from = text_arg(args, 1, "replace", "from")?;
        let to = text_arg(args, 2, "replace", "to")?;
        if from.is_empty() {
            return Err(CalcError::domain("replace: 'from' must not be empty"));
        }
        Ok(Value::Text(s.replace(&from, &to)))
    }
}

/// contains(s, needle)
pub struct Contains;

static CONTAINS_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("s", "string", "Input text"),
    ArgMeta::required("needle", "string", "Substring to look for"),
];

impl FunctionPlugin for Contains {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "contains",
            namespace: "text",
            usage: "contains(s, needle)",
            description: "Whether the text contains the substring",
            args: &CONTAINS_ARGS,
            returns: "boolean",
        }
    }

    fn call(&self, args: &[Value], _ctx: &FnContext) -> Result<Value, CalcError> {
        if args.len() != 2 {
            return Err(CalcError::arg_count("contains", "2", args.len()));
        }
        let s = text_arg(args, 0, "contains", "s")?;
        let needle = text_arg(args, 1, "contains", "needle")?;
        Ok(Value::Bool(s.contains(&needle)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> FnContext {
        FnContext::fixed()
    }

    #[test]
    fn test_case_and_trim() {
        assert_eq!(
            Upper.call(&[Value::from("abc")], &ctx()).unwrap(),
            Value::from("ABC")
        );
        assert_eq!(
            Lower.call(&[Value::from("ABC")], &ctx()).unwrap(),
            Value::from("abc")
        );
        assert_eq!(
            Trim.call(&[Value::from("  x  ")], &ctx()).unwrap(),
            Value::from("x")
        );
    }

    #[test]
    fn test_len_counts_characters() {
        assert_eq!(
            Len.call(&[Value::from("héllo")], &ctx()).unwrap(),
            Value::Number(5.0)
        );
    }

    #[test]
    fn test_join_stringifies_scalars() {
        let list = Value::List(vec![
            Value::Number(1.0),
            Value::from("two"),
            Value::Bool(true),
        ]);
        assert_eq!(
            Join.call(&[list, Value::from(", ")], &ctx()).unwrap(),
            Value::from("1, two, true")
        );
    }

    #[test]
    fn test_join_rejects_nested_lists() {
        let list = Value::List(vec![Value::List(vec![])]);
        let err = Join.call(&[list, Value::from(",")], &ctx()).unwrap_err();
        assert!(err.message.contains("'list'[0]"));
    }

    #[test]
    fn test_replace_and_contains() {
        assert_eq!(
            Replace
                .call(
                    &[Value::from("a-b-c"), Value::from("-"), Value::from("+")],
                    &ctx(),
                )
                .unwrap(),
            Value::from("a+b+c")
        );
        assert!(Replace
            .call(&[Value::from("x"), Value::from(""), Value::from("y")], &ctx())
            .is_err());
        assert_eq!(
            Contains
                .call(&[Value::from("haystack"), Value::from("stack")], &ctx())
                .unwrap(),
            Value::Bool(true)
        );
    }
}
