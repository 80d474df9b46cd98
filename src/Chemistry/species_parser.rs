//! # Species and equation grammar
//!
//! Turns the text of a chemistry entry into structured terms:
//!
//! ```text
//! equation := side ('->' | '<->') side
//! side     := term ('+' term)*
//! term     := [quantity] ( 'e' | 'gas' | 'wall' | Gas '(' ['+' ','] [Electronic] [',v=' level] [',J=' level] ')' )
//! level    := integer | var '[' integer ':' integer ']' | var [('+'|'-') integer]
//! var      := 'v' | 'w'
//! ```
//! Range declarations (`v[0:10]`) are only allowed among reactants; products refer to the
//! declared variables (`v+1`, `w-1`, `v`).
use crate::Chemistry::chem_errors::ParseError;
use crate::Chemistry::state_graph::StateLabels;
use regex::Regex;
use std::sync::LazyLock;

static TERM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?)?\s*([A-Za-z][A-Za-z0-9_\-\^']*)(?:\((.*)\))?$").unwrap()
});
static RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([vw])\[(\d+):(\d+)\]$").unwrap());
static VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([vw])(?:([+-])(\d+))?$").unwrap());
static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-\^']+$").unwrap());

const TERM_GRAMMAR: &str = "[quantity]Gas([+,]Electronic[,v=level[,J=level]]), e, gas or wall";
const LEVEL_GRAMMAR: &str = "integer, v[a:b], w[a:b], v, v+k, v-k, w, w+k or w-k";

/// vibrational or rotational level as written in a reaction template
#[derive(Debug, Clone, PartialEq)]
pub enum LevelExpr {
    Label(String),
    Range { var: char, start: u32, end: u32 },
    Var { var: char, offset: i64 },
}

impl LevelExpr {
    fn parse(text: &str) -> Result<Self, ParseError> {
        if let Some(caps) = RANGE_RE.captures(text) {
            let var = caps[1].chars().next().unwrap_or('v');
            let start: u32 = caps[2].parse().map_err(|_| grammar(text, LEVEL_GRAMMAR))?;
            let end: u32 = caps[3].parse().map_err(|_| grammar(text, LEVEL_GRAMMAR))?;
            if start > end {
                return Err(grammar(text, "a range with start <= end"));
            }
            return Ok(LevelExpr::Range { var, start, end });
        }
        if let Some(caps) = VAR_RE.captures(text) {
            let var = caps[1].chars().next().unwrap_or('v');
            let offset = match (caps.get(2), caps.get(3)) {
                (Some(sign), Some(k)) => {
                    // offsets are bounded like the levels themselves
                    let k: u32 = k.as_str().parse().map_err(|_| grammar(text, "an offset within the level range"))?;
                    let k = i64::from(k);
                    if sign.as_str() == "-" { -k } else { k }
                }
                _ => 0,
            };
            return Ok(LevelExpr::Var { var, offset });
        }
        if LABEL_RE.is_match(text) {
            return Ok(LevelExpr::Label(text.to_owned()));
        }
        Err(grammar(text, LEVEL_GRAMMAR))
    }

    fn variable(&self) -> Option<char> {
        match self {
            LevelExpr::Label(_) => None,
            LevelExpr::Range { var, .. } | LevelExpr::Var { var, .. } => Some(*var),
        }
    }

    /// concrete label for the given values of the range variables
    fn instantiate(
        &self,
        v: Option<u32>,
        w: Option<u32>,
        equation: &str,
    ) -> Result<String, ParseError> {
        let value_of = |var: char| -> Result<u32, ParseError> {
            let value = if var == 'v' { v } else { w };
            value.ok_or_else(|| ParseError::UndeclaredRangeVariable {
                variable: var,
                equation: equation.to_owned(),
            })
        };
        match self {
            LevelExpr::Label(label) => Ok(label.clone()),
            LevelExpr::Range { var, .. } => Ok(value_of(*var)?.to_string()),
            LevelExpr::Var { var, offset } => {
                let level = i64::from(value_of(*var)?)
                    .checked_add(*offset)
                    .and_then(|level| u32::try_from(level).ok())
                    .ok_or_else(|| ParseError::InvalidLevel {
                        expression: self.to_string(),
                        equation: equation.to_owned(),
                    })?;
                Ok(level.to_string())
            }
        }
    }
}

impl std::fmt::Display for LevelExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LevelExpr::Label(l) => write!(f, "{}", l),
            LevelExpr::Range { var, start, end } => write!(f, "{}[{}:{}]", var, start, end),
            LevelExpr::Var { var, offset } if *offset == 0 => write!(f, "{}", var),
            LevelExpr::Var { var, offset } => write!(f, "{}{:+}", var, offset),
        }
    }
}

/// labels of a state template, levels may depend on range variables
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateLabels {
    pub ionic: bool,
    pub electronic: Option<String>,
    pub vibrational: Option<LevelExpr>,
    pub rotational: Option<LevelExpr>,
}

impl TemplateLabels {
    fn levels(&self) -> impl Iterator<Item = &LevelExpr> {
        self.vibrational.iter().chain(self.rotational.iter())
    }

    pub fn instantiate(
        &self,
        v: Option<u32>,
        w: Option<u32>,
        equation: &str,
    ) -> Result<StateLabels, ParseError> {
        Ok(StateLabels {
            ionic: self.ionic,
            electronic: self.electronic.clone(),
            vibrational: self
                .vibrational
                .as_ref()
                .map(|l| l.instantiate(v, w, equation))
                .transpose()?,
            rotational: self
                .rotational
                .as_ref()
                .map(|l| l.instantiate(v, w, equation))
                .transpose()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Species {
    Electron,
    /// third-body placeholder
    Gas,
    /// surface placeholder
    Wall,
    State { gas: String, labels: TemplateLabels },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub quantity: f64,
    pub species: Species,
}

/// a declared range of one of the variables `v`/`w`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeDecl {
    pub var: char,
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEquation {
    pub text: String,
    pub reactants: Vec<Term>,
    pub products: Vec<Term>,
    pub is_reverse: bool,
    pub v_range: Option<RangeDecl>,
    pub w_range: Option<RangeDecl>,
}

fn grammar(text: &str, expected: &str) -> ParseError {
    ParseError::Grammar {
        text: text.to_owned(),
        expected: expected.to_owned(),
    }
}

/// splits on `sep` outside of parentheses
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn parse_labels(inner: &str, text: &str) -> Result<TemplateLabels, ParseError> {
    let mut labels = TemplateLabels {
        ionic: false,
        electronic: None,
        vibrational: None,
        rotational: None,
    };
    for (i, item) in inner.split(',').map(str::trim).enumerate() {
        if item == "+" {
            if i != 0 {
                return Err(grammar(text, "the ionic mark '+' first inside the parentheses"));
            }
            labels.ionic = true;
        } else if let Some(level) = item.strip_prefix("v=") {
            if labels.vibrational.is_some() || labels.rotational.is_some() {
                return Err(grammar(text, TERM_GRAMMAR));
            }
            labels.vibrational = Some(LevelExpr::parse(level.trim())?);
        } else if let Some(level) = item.strip_prefix("J=") {
            if labels.vibrational.is_none() || labels.rotational.is_some() {
                return Err(grammar(text, "a rotational level after a vibrational one"));
            }
            labels.rotational = Some(LevelExpr::parse(level.trim())?);
        } else if LABEL_RE.is_match(item)
            && labels.electronic.is_none()
            && labels.vibrational.is_none()
        {
            labels.electronic = Some(item.to_owned());
        } else {
            return Err(grammar(text, TERM_GRAMMAR));
        }
    }
    Ok(labels)
}

/// parses one term of a reaction side, e.g. `2N2(X,v=v+1)`
pub fn parse_term(text: &str) -> Result<Term, ParseError> {
    let trimmed = text.trim();
    let caps = TERM_RE
        .captures(trimmed)
        .ok_or_else(|| grammar(trimmed, TERM_GRAMMAR))?;
    let quantity = match caps.get(1) {
        Some(q) => q
            .as_str()
            .parse::<f64>()
            .map_err(|_| grammar(trimmed, TERM_GRAMMAR))?,
        None => 1.0,
    };
    if quantity <= 0.0 {
        return Err(grammar(trimmed, "a positive quantity"));
    }
    let name = &caps[2];
    let species = match (name, caps.get(3)) {
        ("e", None) => Species::Electron,
        ("gas", None) => Species::Gas,
        ("wall", None) => Species::Wall,
        (gas, Some(inner)) => Species::State {
            gas: gas.to_owned(),
            labels: parse_labels(inner.as_str(), trimmed)?,
        },
        (_, None) => return Err(grammar(trimmed, TERM_GRAMMAR)),
    };
    Ok(Term { quantity, species })
}

fn parse_side(text: &str, equation: &str) -> Result<Vec<Term>, ParseError> {
    if text.trim().is_empty() {
        return Err(grammar(equation, "non-empty reactant and product sides"));
    }
    split_top_level(text, '+').into_iter().map(parse_term).collect()
}

fn range_declarations(terms: &[Term]) -> Vec<RangeDecl> {
    let mut decls = Vec::new();
    for term in terms {
        if let Species::State { labels, .. } = &term.species {
            for level in labels.levels() {
                if let LevelExpr::Range { var, start, end } = level {
                    decls.push(RangeDecl {
                        var: *var,
                        start: *start,
                        end: *end,
                    });
                }
            }
        }
    }
    decls
}

/// parses a full reaction equation and validates its range declarations
pub fn parse_equation(equation: &str) -> Result<ParsedEquation, ParseError> {
    let (lhs, rhs, is_reverse) = if let Some((l, r)) = equation.split_once("<->") {
        (l, r, true)
    } else if let Some((l, r)) = equation.split_once("->") {
        (l, r, false)
    } else {
        return Err(grammar(equation, "'reactants -> products' or 'reactants <-> products'"));
    };
    if rhs.contains("->") {
        return Err(grammar(equation, "a single arrow"));
    }
    let reactants = parse_side(lhs, equation)?;
    let products = parse_side(rhs, equation)?;

    if !range_declarations(&products).is_empty() {
        return Err(grammar(equation, "range declarations among reactants only"));
    }
    let mut v_range = None;
    let mut w_range = None;
    for decl in range_declarations(&reactants) {
        let slot = if decl.var == 'v' {
            &mut v_range
        } else {
            &mut w_range
        };
        if slot.is_some() {
            return Err(ParseError::DuplicateRange {
                variable: decl.var,
                equation: equation.to_owned(),
            });
        }
        *slot = Some(decl);
    }
    for term in reactants.iter().chain(products.iter()) {
        if let Species::State { labels, .. } = &term.species {
            for var in labels.levels().filter_map(LevelExpr::variable) {
                let declared = if var == 'v' { v_range } else { w_range };
                if declared.is_none() {
                    return Err(ParseError::UndeclaredRangeVariable {
                        variable: var,
                        equation: equation.to_owned(),
                    });
                }
            }
        }
    }
    Ok(ParsedEquation {
        text: equation.trim().to_owned(),
        reactants,
        products,
        is_reverse,
        v_range,
        w_range,
    })
}
