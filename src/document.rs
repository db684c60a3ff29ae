//! Brazilian tax document validation and input masks.
//!
//! CPF (individuals, 11 digits) and CNPJ (companies, 14 digits) both end in
//! two check digits computed from weighted modulo-11 sums of the preceding
//! digits. Everything here is a pure function of its input.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const CPF_LENGTH: usize = 11;
pub const CNPJ_LENGTH: usize = 14;
pub const CEP_LENGTH: usize = 8;

const CPF_FIRST_WEIGHTS: [u32; 9] = [10, 9, 8, 7, 6, 5, 4, 3, 2];
const CPF_SECOND_WEIGHTS: [u32; 10] = [11, 10, 9, 8, 7, 6, 5, 4, 3, 2];
const CNPJ_FIRST_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const CNPJ_SECOND_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

const CPF_MASK: &str = "###.###.###-##";
const CNPJ_MASK: &str = "##.###.###/####-##";
const CEP_MASK: &str = "#####-###";

/// Kind of Brazilian tax document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentKind {
    Cpf,
    Cnpj,
}

impl DocumentKind {
    /// Number of digits of a canonical document of this kind.
    pub fn length(self) -> usize {
        match self {
            DocumentKind::Cpf => CPF_LENGTH,
            DocumentKind::Cnpj => CNPJ_LENGTH,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Cpf => "CPF",
            DocumentKind::Cnpj => "CNPJ",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strips every non-digit character.
pub fn clean_digits(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Picks the document kind from the cleaned length of `input`.
pub fn detect_kind(input: &str) -> Option<DocumentKind> {
    match clean_digits(input).len() {
        CPF_LENGTH => Some(DocumentKind::Cpf),
        CNPJ_LENGTH => Some(DocumentKind::Cnpj),
        _ => None,
    }
}

/// Validates `input` against the check-digit algorithm of `kind`.
///
/// Formatting characters are ignored. Wrong lengths and single repeated
/// digits (e.g. `111.111.111-11`) are rejected.
pub fn validate_document(input: &str, kind: DocumentKind) -> bool {
    let digits = match canonical_digits(input, kind.length()) {
        Some(digits) => digits,
        None => return false,
    };

    let (first_weights, second_weights): (&[u32], &[u32]) = match kind {
        DocumentKind::Cpf => (&CPF_FIRST_WEIGHTS, &CPF_SECOND_WEIGHTS),
        DocumentKind::Cnpj => (&CNPJ_FIRST_WEIGHTS, &CNPJ_SECOND_WEIGHTS),
    };

    let body = kind.length() - 2;
    let first = check_digit(&digits[..body], first_weights);
    let second = check_digit(&digits[..body + 1], second_weights);

    digits[body] == first && digits[body + 1] == second
}

pub fn is_valid_cpf(input: &str) -> bool {
    validate_document(input, DocumentKind::Cpf)
}

pub fn is_valid_cnpj(input: &str) -> bool {
    validate_document(input, DocumentKind::Cnpj)
}

/// Appends the two check digits to a 9-digit CPF base.
pub fn complete_cpf(base: &str) -> Option<String> {
    complete(base, CPF_LENGTH - 2, &CPF_FIRST_WEIGHTS, &CPF_SECOND_WEIGHTS)
}

/// Appends the two check digits to a 12-digit CNPJ base.
pub fn complete_cnpj(base: &str) -> Option<String> {
    complete(base, CNPJ_LENGTH - 2, &CNPJ_FIRST_WEIGHTS, &CNPJ_SECOND_WEIGHTS)
}

/// Progressive CPF mask: `000.000.000-00`.
pub fn format_cpf(input: &str) -> String {
    apply_mask(&clean_digits(input), CPF_MASK)
}

/// Progressive CNPJ mask: `00.000.000/0000-00`.
pub fn format_cnpj(input: &str) -> String {
    apply_mask(&clean_digits(input), CNPJ_MASK)
}

/// Progressive CEP mask: `00000-000`.
pub fn format_cep(input: &str) -> String {
    apply_mask(&clean_digits(input), CEP_MASK)
}

/// Masks as CPF up to 11 digits and as CNPJ beyond that.
pub fn format_document(input: &str) -> String {
    let digits = clean_digits(input);
    if digits.len() > CPF_LENGTH {
        apply_mask(&digits, CNPJ_MASK)
    } else {
        apply_mask(&digits, CPF_MASK)
    }
}

fn canonical_digits(input: &str, length: usize) -> Option<Vec<u32>> {
    let digits: Vec<u32> = input.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != length {
        return None;
    }
    // Repeated digits satisfy the checksum but are never issued
    if digits.iter().all(|d| *d == digits[0]) {
        return None;
    }
    Some(digits)
}

fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    match sum % 11 {
        0 | 1 => 0,
        remainder => 11 - remainder,
    }
}

fn complete(
    base: &str,
    body: usize,
    first_weights: &[u32],
    second_weights: &[u32],
) -> Option<String> {
    let mut digits: Vec<u32> = base.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != body {
        return None;
    }
    let first = check_digit(&digits, first_weights);
    digits.push(first);
    let second = check_digit(&digits, second_weights);
    digits.push(second);

    Some(
        digits
            .iter()
            .filter_map(|d| char::from_digit(*d, 10))
            .collect(),
    )
}

fn apply_mask(digits: &str, mask: &str) -> String {
    let mut out = String::with_capacity(mask.len());
    let mut remaining = digits.chars().peekable();

    for slot in mask.chars() {
        if remaining.peek().is_none() {
            break;
        }
        if slot == '#' {
            if let Some(d) = remaining.next() {
                out.push(d);
            }
        } else {
            out.push(slot);
        }
    }

    out
}
