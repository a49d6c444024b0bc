use std::fmt::Display;

use itertools::Itertools;

use crate::model_checking::Label;

pub fn initial_state_arrow_num(initial_state_name: &impl Display, num: usize) -> String {
    format!(
        "invis{num} [label = \"\", shape = none, height = 0, width = 0]\n\
        invis{num} -> \"{initial_state_name}\"\n"
    )
}

pub fn node(name: &impl Display, accepting: bool) -> String {
    let shape = if accepting { "doublecircle" } else { "circle" };
    format!("\"{name}\" [shape = {shape}]\n")
}

pub fn edge(source: &impl Display, label: &Label, target: &impl Display) -> String {
    format!("\"{source}\" -> \"{target}\" [label = \"{}\"]\n", label_string(label))
}

pub fn label_string(label: &Label) -> String {
    format!("{{{}}}", label.iter().join(", "))
}

pub fn digraph(name: &str, body: impl IntoIterator<Item = String>) -> String {
    format!("digraph {name} {{\n{}}}\n", body.into_iter().join(""))
}
