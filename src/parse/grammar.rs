use std::collections::BTreeSet;

use winnow::ascii::{dec_int, till_line_ending};
use winnow::combinator::{alt, cut_err, delimited, not, opt, preceded, repeat, separated, terminated};
use winnow::error::{ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_while};

use crate::{
    Caveat, FormKind, KeyValue, Predicate, PredicateKind, Range, RegexCaveat, Value, VersionCaveat,
    VersionCheck,
};

use super::parser::ParsedCriteria;

// -- Whitespace & comments --------------------------------------------------

fn ws(input: &mut &str) -> ModalResult<()> {
    let _: () = repeat(
        0..,
        alt((
            take_while(1.., |c: char| c.is_ascii_whitespace()).void(),
            ('#', till_line_ending).void(),
        )),
    )
    .parse_next(input)?;
    Ok(())
}

// -- Identifiers & keywords -------------------------------------------------

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn ident<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1.., |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| is_ident_char(c) || c == '.'),
    )
        .take()
        .parse_next(input)
}

/// A whole word, so `in` does not match the start of `index`.
fn keyword<'i>(word: &'static str) -> impl FnMut(&mut &'i str) -> ModalResult<&'i str> {
    move |input: &mut &'i str| {
        preceded(ws, terminated(word, not(one_of(is_ident_char)))).parse_next(input)
    }
}

// -- Values -----------------------------------------------------------------

fn string_literal(input: &mut &str) -> ModalResult<String> {
    '"'.parse_next(input)?;
    let mut s = String::new();
    loop {
        let ch = any.parse_next(input)?;
        match ch {
            '"' => return Ok(s),
            '\\' => {
                let esc = any.parse_next(input)?;
                match esc {
                    '"' => s.push('"'),
                    '\\' => s.push('\\'),
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    other => {
                        s.push('\\');
                        s.push(other);
                    }
                }
            }
            c => s.push(c),
        }
    }
}

fn negative_number(input: &mut &str) -> ModalResult<Value> {
    let neg_str = (
        '-',
        take_while(1.., |c: char| c.is_ascii_digit() || c == '.'),
    )
        .take()
        .parse_next(input)?;
    if neg_str.contains('.') {
        let f: f64 = neg_str
            .parse()
            .map_err(|_| ErrMode::from_input(input).cut())?;
        Ok(Value::Float(f))
    } else {
        let i: i64 = neg_str
            .parse()
            .map_err(|_| ErrMode::from_input(input).cut())?;
        Ok(Value::Int(i))
    }
}

fn float_literal(input: &mut &str) -> ModalResult<f64> {
    (
        take_while(1.., |c: char| c.is_ascii_digit()),
        '.',
        take_while(1.., |c: char| c.is_ascii_digit()),
    )
        .take()
        .try_map(|s: &str| s.parse::<f64>())
        .parse_next(input)
}

fn value(input: &mut &str) -> ModalResult<Value> {
    ws.parse_next(input)?;
    alt((
        string_literal.map(Value::String),
        "true".value(Value::Bool(true)),
        "false".value(Value::Bool(false)),
        negative_number,
        float_literal.map(Value::Float),
        dec_int::<_, i64, _>.map(Value::Int),
    ))
    .context(StrContext::Expected(StrContextValue::Description("value")))
    .parse_next(input)
}

fn number(input: &mut &str) -> ModalResult<f64> {
    value
        .verify_map(|v| v.as_f64())
        .context(StrContext::Expected(StrContextValue::Description("number")))
        .parse_next(input)
}

fn boolean(input: &mut &str) -> ModalResult<bool> {
    ws.parse_next(input)?;
    alt(("true".value(true), "false".value(false)))
        .context(StrContext::Expected(StrContextValue::Description("true or false")))
        .parse_next(input)
}

// -- Caveats ----------------------------------------------------------------

fn value_list(input: &mut &str) -> ModalResult<Caveat> {
    let values: Vec<Value> = delimited(
        (ws, '['),
        separated(0.., value, (ws, ',')),
        (ws, cut_err(']')),
    )
    .parse_next(input)?;
    let set: BTreeSet<KeyValue> = values.into_iter().map(KeyValue::from).collect();
    Ok(Caveat::Equality(set))
}

fn bound(input: &mut &str) -> ModalResult<Option<f64>> {
    ws.parse_next(input)?;
    alt(('*'.value(None), number.map(Some))).parse_next(input)
}

/// `[lo, hi)` style interval; `*` leaves an end unbounded.
fn range(input: &mut &str) -> ModalResult<Caveat> {
    ws.parse_next(input)?;
    let lo_inclusive = cut_err(alt(('['.value(true), '('.value(false))))
        .context(StrContext::Expected(StrContextValue::Description("[ or (")))
        .parse_next(input)?;
    let lo = cut_err(bound).parse_next(input)?;
    (ws, cut_err(',')).parse_next(input)?;
    let hi = cut_err(bound).parse_next(input)?;
    ws.parse_next(input)?;
    let hi_inclusive = cut_err(alt((']'.value(true), ')'.value(false))))
        .context(StrContext::Expected(StrContextValue::Description("] or )")))
        .parse_next(input)?;
    Ok(Caveat::Range(Range::new(
        lo,
        hi,
        lo_inclusive && lo.is_some(),
        hi_inclusive && hi.is_some(),
    )))
}

fn pattern(input: &mut &str) -> ModalResult<Caveat> {
    ws.parse_next(input)?;
    let source = cut_err(string_literal)
        .context(StrContext::Expected(StrContextValue::Description("pattern")))
        .parse_next(input)?;
    Ok(Caveat::Regex(RegexCaveat::new(&source)))
}

fn version(input: &mut &str) -> ModalResult<Caveat> {
    ws.parse_next(input)?;
    let (check, exclude_base) = cut_err(alt((
        ">=".value((VersionCheck::AtLeast, false)),
        ">".value((VersionCheck::AtLeast, true)),
        "<=".value((VersionCheck::AtMost, false)),
        "<".value((VersionCheck::AtMost, true)),
    )))
    .context(StrContext::Expected(StrContextValue::Description(
        "version operator",
    )))
    .parse_next(input)?;
    ws.parse_next(input)?;
    let base = cut_err(string_literal)
        .context(StrContext::Expected(StrContextValue::Description("version")))
        .parse_next(input)?;
    Ok(Caveat::Version(VersionCaveat::new(check, &base, exclude_base)))
}

fn caveat(input: &mut &str) -> ModalResult<Caveat> {
    alt((
        preceded((keyword("in"), keyword("range")), cut_err(range)),
        preceded(keyword("in"), cut_err(value_list)),
        preceded(keyword("matches"), pattern),
        preceded(keyword("version"), version),
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "in, matches, or version",
    )))
    .parse_next(input)
}

// -- Predicates & clauses ---------------------------------------------------

fn predicate(input: &mut &str) -> ModalResult<Predicate> {
    ws.parse_next(input)?;
    let path = ident
        .context(StrContext::Expected(StrContextValue::Description(
            "field path",
        )))
        .parse_next(input)?;
    let negated = opt(keyword("not")).parse_next(input)?.is_some();
    let caveat = cut_err(caveat).parse_next(input)?;

    let mut predicate = Predicate::new(PredicateKind::Included, path, caveat);
    if negated {
        predicate = !predicate;
    }
    if let Some(weight) = opt(preceded(keyword("weight"), cut_err(number))).parse_next(input)? {
        predicate = predicate.with_weight(weight);
    }
    if let Some(default) = opt(preceded(keyword("default"), cut_err(boolean))).parse_next(input)? {
        predicate = predicate.with_default(default);
    }
    Ok(predicate)
}

/// `( p1 <joiner> p2 ... )`
fn clause(input: &mut &str, joiner: &'static str) -> ModalResult<Vec<Predicate>> {
    (ws, '(').parse_next(input)?;
    let mut predicates = vec![cut_err(predicate).parse_next(input)?];
    while opt(keyword(joiner)).parse_next(input)?.is_some() {
        predicates.push(cut_err(predicate).parse_next(input)?);
    }
    (ws, cut_err(')')).parse_next(input)?;
    Ok(predicates)
}

// -- Criteria definitions ---------------------------------------------------

fn criteria_def(input: &mut &str) -> ModalResult<ParsedCriteria> {
    let form = alt((
        keyword("dnf").value(FormKind::Dnf),
        keyword("cnf").value(FormKind::Cnf),
    ))
    .parse_next(input)?;
    ws.parse_next(input)?;
    let id = cut_err(string_literal)
        .context(StrContext::Expected(StrContextValue::Description(
            "criteria id",
        )))
        .parse_next(input)?;
    (ws, cut_err('{')).parse_next(input)?;

    let (inner, outer) = match form {
        FormKind::Dnf => ("and", "or"),
        FormKind::Cnf => ("or", "and"),
    };
    let mut clauses = vec![cut_err(|i: &mut &str| clause(i, inner))
        .context(StrContext::Expected(StrContextValue::Description("clause")))
        .parse_next(input)?];
    while opt(keyword(outer)).parse_next(input)?.is_some() {
        clauses.push(cut_err(|i: &mut &str| clause(i, inner)).parse_next(input)?);
    }
    (ws, cut_err('}')).parse_next(input)?;

    Ok(ParsedCriteria { id, form, clauses })
}

// -- Top-level parser -------------------------------------------------------

pub fn parse_criteria(input: &mut &str) -> ModalResult<Vec<ParsedCriteria>> {
    let defs: Vec<ParsedCriteria> = repeat(0.., criteria_def).parse_next(input)?;
    ws.parse_next(input)?;
    Ok(defs)
}
