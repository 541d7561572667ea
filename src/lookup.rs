//! Fixed recoding tables for taxonomic orders and purpose codes.

use polars::prelude::*;

/// Taxonomic order → animal order label.
pub const ANIMAL_ORDERS: [(&str, &str); 13] = [
    ("Primates", "Primates"),
    ("Carnivora", "Carnivores"),
    ("Cetacea", "Whales and Dolphins"),
    ("Proboscidea", "Elephants"),
    ("Artiodactyla", "Even-toed Ungulates"),
    ("Perissodactyla", "Odd-toed Ungulates"),
    ("Chiroptera", "Bats"),
    ("Pilosa", "Sloths and Anteaters"),
    ("Pholidota", "Pangolins"),
    ("Sirenia", "Sea-cows"),
    ("Scandentia", "Treeshrews"),
    ("Diprotodontia", "Marsupials"),
    ("Cingulata", "Armadillos"),
];

/// Purpose code → purpose label.
pub const PURPOSES: [(&str, &str); 12] = [
    ("B", "Captive breeding"),
    ("E", "Educational"),
    ("G", "Botanical Garden"),
    ("H", "Hunting trophy"),
    ("L", "Forensic"),
    ("M", "Medical"),
    ("N", "Reintroduction"),
    ("P", "Personal"),
    ("Q", "Circus"),
    ("S", "Scientific"),
    ("T", "Commercial"),
    ("Z", "Zoo"),
];

pub fn animal_order_label(order: &str) -> Option<&'static str> {
    lookup(&ANIMAL_ORDERS, order)
}

pub fn purpose_label(code: &str) -> Option<&'static str> {
    lookup(&PURPOSES, code)
}

fn lookup(table: &[(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(code, _)| *code == key)
        .map(|(_, label)| *label)
}

/// Build a recoding expression over `column`.
///
/// Each table entry becomes one `when/then` branch; values that match no
/// entry (including nulls) evaluate to `fallback`.
pub fn recode_expr(column: &str, table: &[(&str, &str)], fallback: Expr) -> Expr {
    table.iter().rev().fold(fallback, |otherwise, (code, label)| {
        when(col(column).eq(lit(*code)))
            .then(lit(*label))
            .otherwise(otherwise)
    })
}
