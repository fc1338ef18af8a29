//! The plain-text persistence format for a [`TotalDpa`] (spec.md §6).
//!
//! This is the sole bit-exact external artifact of the core; every other
//! interface is in-process. The format is a fixed, ordered sequence of
//! `key: value` lines, with containers written as `{a,b,c}` and per-state
//! edge lists semicolon-separated.

use std::io::{self, BufRead, Write};

use super::{Color, DpaStateIndex, Parity, Score, TotalDpa, VariableStatus};
use crate::error::InvalidFileError;

fn write_container<W: Write, T: std::fmt::Display, I: IntoIterator<Item = T>>(
    w: &mut W,
    items: I,
) -> io::Result<()> {
    write!(w, "{{")?;
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            write!(w, ",")?;
        }
        write!(w, "{}", item)?;
    }
    write!(w, "}}")
}

fn status_code(status: VariableStatus) -> u8 {
    match status {
        VariableStatus::Used => 0,
        VariableStatus::Unused => 1,
        VariableStatus::ConstantTrue => 2,
        VariableStatus::ConstantFalse => 3,
    }
}

fn status_from_code(code: u8) -> Option<VariableStatus> {
    match code {
        0 => Some(VariableStatus::Used),
        1 => Some(VariableStatus::Unused),
        2 => Some(VariableStatus::ConstantTrue),
        3 => Some(VariableStatus::ConstantFalse),
        _ => None,
    }
}

/// Writes `dpa` to `writer` in the §6 text format.
pub fn write<W: Write>(dpa: &TotalDpa, mut writer: W) -> io::Result<()> {
    write!(writer, "in_vars: ")?;
    write_container(&mut writer, dpa.in_vars.iter())?;
    writeln!(writer)?;

    write!(writer, "out_vars: ")?;
    write_container(&mut writer, dpa.out_vars.iter())?;
    writeln!(writer)?;

    writeln!(writer, "ltl_formula: {}", dpa.ltl_formula)?;
    writeln!(writer, "n_io_vars: {}", dpa.in_vars.len() + dpa.out_vars.len())?;
    writeln!(writer, "product_state_size: {}", dpa.product_state_size)?;
    writeln!(writer, "simplified_ltl: {}", dpa.simplified_ltl as u8)?;
    writeln!(
        writer,
        "parity: {}",
        if dpa.parity == Parity::Even { 0 } else { 1 }
    )?;
    writeln!(writer, "max_color: {}", dpa.max_color)?;

    write!(writer, "statuses: ")?;
    write_container(&mut writer, dpa.statuses.iter().map(|s| status_code(*s)))?;
    writeln!(writer)?;

    writeln!(writer, "n_states: {}", dpa.state_count())?;

    write!(writer, "states: ")?;
    for (i, _) in dpa.edges.iter().enumerate() {
        if i > 0 {
            write!(writer, ";")?;
        }
        write_container(&mut writer, std::iter::once(i))?;
    }
    writeln!(writer)?;

    write!(writer, "states_is_top: ")?;
    write_container(&mut writer, dpa.is_top.iter().map(|&b| b as u8))?;
    writeln!(writer)?;

    write!(writer, "states_is_bottom: ")?;
    write_container(&mut writer, dpa.is_bottom.iter().map(|&b| b as u8))?;
    writeln!(writer)?;

    for (state, state_edges) in dpa.edges.iter().enumerate() {
        write!(writer, "state_{}_edges: ", state)?;
        for (letter, (succ, color, score)) in state_edges.iter().enumerate() {
            if letter > 0 {
                write!(writer, ";")?;
            }
            write!(writer, "{{{},{},{},{}}}", letter, succ, color, score)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

fn expect_header<'a>(line: &'a str, header: &str) -> Result<&'a str, InvalidFileError> {
    let line = line.trim();
    let prefix = format!("{}:", header);
    line.strip_prefix(&prefix)
        .map(str::trim)
        .ok_or_else(|| InvalidFileError::missing_section(header))
}

fn parse_container(value: &str) -> Result<Vec<String>, InvalidFileError> {
    let value = value.trim();
    let inner = value
        .strip_prefix('{')
        .and_then(|v| v.strip_suffix('}'))
        .ok_or_else(|| InvalidFileError::new(format!("expected container, found '{}'", value)))?;
    if inner.is_empty() {
        return Ok(Vec::new());
    }
    Ok(inner.split(',').map(|s| s.trim().to_owned()).collect())
}

fn parse_u32(s: &str, what: &str) -> Result<u32, InvalidFileError> {
    s.trim()
        .parse()
        .map_err(|_| InvalidFileError::new(format!("expected integer for {}, found '{}'", what, s)))
}

fn parse_f64(s: &str, what: &str) -> Result<f64, InvalidFileError> {
    s.trim()
        .parse()
        .map_err(|_| InvalidFileError::new(format!("expected float for {}, found '{}'", what, s)))
}

/// Loads a [`TotalDpa`] from the §6 text format.
///
/// # Errors
///
/// Returns [`InvalidFileError`] if any section header is missing, out of
/// order, or malformed.
pub fn load<R: BufRead>(reader: R) -> Result<TotalDpa, InvalidFileError> {
    let lines: Vec<String> = reader
        .lines()
        .map(|l| l.map_err(|e| InvalidFileError::new(e.to_string())))
        .collect::<Result<_, _>>()?;
    let mut lines = lines.into_iter();

    let mut next = || {
        lines
            .next()
            .ok_or_else(|| InvalidFileError::new("unexpected end of file"))
    };

    let in_vars = parse_container(expect_header(&next()?, "in_vars")?)?;
    let out_vars = parse_container(expect_header(&next()?, "out_vars")?)?;
    let ltl_formula = expect_header(&next()?, "ltl_formula")?.to_owned();
    let _n_io_vars = parse_u32(expect_header(&next()?, "n_io_vars")?, "n_io_vars")?;
    let product_state_size =
        parse_u32(expect_header(&next()?, "product_state_size")?, "product_state_size")? as usize;
    let simplified_ltl = parse_u32(expect_header(&next()?, "simplified_ltl")?, "simplified_ltl")? != 0;
    let parity_code = parse_u32(expect_header(&next()?, "parity")?, "parity")?;
    let parity = if parity_code == 0 { Parity::Even } else { Parity::Odd };
    let max_color: Color = parse_u32(expect_header(&next()?, "max_color")?, "max_color")?;

    let statuses = parse_container(expect_header(&next()?, "statuses")?)?
        .into_iter()
        .map(|s| {
            let code: u8 = s
                .parse()
                .map_err(|_| InvalidFileError::new(format!("invalid status code '{}'", s)))?;
            status_from_code(code).ok_or_else(|| InvalidFileError::new(format!("invalid status code '{}'", code)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let n_states = parse_u32(expect_header(&next()?, "n_states")?, "n_states")? as usize;

    let _states = expect_header(&next()?, "states")?.to_owned();

    let is_top = parse_container(expect_header(&next()?, "states_is_top")?)?
        .into_iter()
        .map(|s| s.trim() != "0")
        .collect::<Vec<_>>();
    let is_bottom = parse_container(expect_header(&next()?, "states_is_bottom")?)?
        .into_iter()
        .map(|s| s.trim() != "0")
        .collect::<Vec<_>>();

    if is_top.len() != n_states || is_bottom.len() != n_states {
        return Err(InvalidFileError::new(
            "states_is_top/states_is_bottom length does not match n_states",
        ));
    }

    let mut edges = Vec::with_capacity(n_states);
    for state in 0..n_states {
        let header = format!("state_{}_edges", state);
        let value = expect_header(&next()?, &header)?;
        let mut state_edges = Vec::new();
        if !value.is_empty() {
            for edge_str in value.split(';') {
                let inner = edge_str
                    .trim()
                    .strip_prefix('{')
                    .and_then(|v| v.strip_suffix('}'))
                    .ok_or_else(|| InvalidFileError::new(format!("malformed edge '{}'", edge_str)))?;
                let parts: Vec<&str> = inner.split(',').collect();
                if parts.len() != 4 {
                    return Err(InvalidFileError::new(format!("malformed edge '{}'", edge_str)));
                }
                let _letter = parse_u32(parts[0], "letter")?;
                let succ: DpaStateIndex = parse_u32(parts[1], "successor")?;
                let color: Color = parse_u32(parts[2], "color")?;
                let score: Score = parse_f64(parts[3], "score")?;
                state_edges.push((succ, color, score));
            }
        }
        edges.push(state_edges);
    }

    Ok(TotalDpa {
        in_vars,
        out_vars,
        ltl_formula,
        simplified_ltl,
        parity,
        max_color,
        statuses,
        product_state_size,
        is_top,
        is_bottom,
        edges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dpa::{Acceptance, DpaFactory, IoLetter};

    struct TwoStateDpa;
    impl DpaFactory for TwoStateDpa {
        type State = u8;
        fn initial_product_state(&self) -> Self::State {
            0
        }
        fn successor(&self, state: &Self::State, letter: IoLetter) -> (Self::State, Color, Score) {
            if *state == 0 && letter == 1 {
                (1, 1, 0.5)
            } else {
                (*state, 0, 1.0)
            }
        }
        fn is_top(&self, _: &Self::State) -> bool {
            false
        }
        fn is_bottom(&self, _: &Self::State) -> bool {
            false
        }
        fn acceptance(&self) -> Acceptance {
            Acceptance::Parity
        }
        fn max_color(&self) -> Color {
            1
        }
        fn parity(&self) -> Parity {
            Parity::Odd
        }
        fn variable_status(&self, _: usize) -> VariableStatus {
            VariableStatus::Used
        }
        fn num_ap(&self) -> usize {
            1
        }
    }

    #[test]
    fn test_round_trip() {
        let dpa = TotalDpa::build(&TwoStateDpa, &["a".to_owned()], &[], "F a", false).unwrap();

        let mut buf = Vec::new();
        write(&dpa, &mut buf).unwrap();

        let loaded = load(io::Cursor::new(buf)).unwrap();
        assert_eq!(loaded.state_count(), dpa.state_count());
        assert_eq!(loaded.max_color(), dpa.max_color());
        assert_eq!(loaded.parity(), dpa.parity());
        for state in 0..dpa.state_count() as DpaStateIndex {
            for letter in 0..(1u64 << dpa.alphabet_size()) {
                assert_eq!(loaded.successor(state, letter).unwrap(), dpa.successor(state, letter).unwrap());
            }
        }
    }

    #[test]
    fn test_missing_section() {
        let text = "in_vars: {}\n";
        let result = load(io::Cursor::new(text.as_bytes()));
        assert!(result.is_err());
    }
}
