//! # Genealogy Command Handler
//!
//! `equidectl genealogy <name> [--depth N] [--id N] [--age-window] [--breed B]`

use std::fmt::{Display, Write as _};
use std::str::FromStr;

use handled::Handle;

use crate::commands::errors::UserError;
use crate::{
    Depth, GenealogyNode, GenealogyResponse, HorseName, RecordSource, ResolutionMode, cli_utils,
    http_utils,
};

const GENEALOGY_USAGE: &str =
    "Usage: equidectl genealogy <name> [--depth N] [--id N] [--age-window] [--breed BREED]";

/// Arguments of the genealogy command after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenealogyArgs {
    pub name: HorseName,
    pub depth: Option<Depth>,
    pub id: Option<i32>,
    pub mode: ResolutionMode,
    pub breed: Option<String>,
}

impl GenealogyArgs {
    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![("mode", self.mode.to_string())];
        if let Some(depth) = self.depth {
            query.push(("depth", depth.to_string()));
        }
        if let Some(id) = self.id {
            query.push(("id", id.to_string()));
        }
        if let Some(breed) = &self.breed {
            query.push(("breed", breed.clone()));
        }
        query
    }
}

fn flag_value<'a>(
    flag: &str,
    args: &mut impl Iterator<Item = &'a String>,
) -> Result<&'a str, UserError> {
    args.next().map(String::as_str).ok_or_else(|| UserError {
        message: format!("{} requires a value", flag),
        usage_hint: Some(GENEALOGY_USAGE.to_string()),
    })
}

fn parse_user<T, E>(raw: &str) -> Result<T, UserError>
where
    T: FromStr<Err = E>,
    E: Handle<UserError> + Display,
{
    raw.parse().map_err(|e: E| {
        e.handle().unwrap_or_else(|| UserError {
            message: e.to_string(),
            usage_hint: None,
        })
    })
}

/// Splits the genealogy arguments into the horse name and its options.
pub fn parse_genealogy_args(args: &[String]) -> Result<GenealogyArgs, UserError> {
    let mut name = None;
    let mut depth = None;
    let mut id = None;
    let mut mode = ResolutionMode::Lenient;
    let mut breed = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--depth" => {
                depth = Some(parse_user::<Depth, _>(flag_value("--depth", &mut iter)?)?);
            }
            "--id" => {
                let raw = flag_value("--id", &mut iter)?;
                id = Some(raw.parse::<i32>().map_err(|_| UserError {
                    message: format!("Invalid id: '{}' is not an integer", raw),
                    usage_hint: Some(GENEALOGY_USAGE.to_string()),
                })?);
            }
            "--age-window" => mode = ResolutionMode::AgeWindow,
            "--breed" => breed = Some(flag_value("--breed", &mut iter)?.to_string()),
            flag if flag.starts_with("--") => {
                return Err(UserError {
                    message: format!("Unknown option '{}'", flag),
                    usage_hint: Some(GENEALOGY_USAGE.to_string()),
                });
            }
            positional if name.is_none() => name = Some(positional.to_string()),
            extra => {
                return Err(UserError {
                    message: format!("Unexpected argument '{}'", extra),
                    usage_hint: Some(GENEALOGY_USAGE.to_string()),
                });
            }
        }
    }

    let Some(name) = name else {
        return Err(UserError {
            message: "genealogy command requires a horse name".to_string(),
            usage_hint: Some(GENEALOGY_USAGE.to_string()),
        });
    };
    Ok(GenealogyArgs {
        name: parse_user(&name)?,
        depth,
        id,
        mode,
        breed,
    })
}

fn describe(node: &GenealogyNode) -> String {
    let mut line = node.name.clone();
    if let Some(id) = node.id {
        let _ = write!(line, " (#{})", id);
    }
    let _ = write!(
        line,
        " {} {} {}",
        node.birth_year.map(|y| y.to_string()).as_deref().unwrap_or("?"),
        cli_utils::or_unknown(node.sex.as_deref()),
        cli_utils::or_unknown(node.color.as_deref()),
    );
    if node.source == RecordSource::Fallback {
        line.push_str(" [participations]");
    }
    line
}

fn render_parents(node: &GenealogyNode, prefix: &str, out: &mut String) {
    let parents = [
        ("father", node.father_name.as_deref(), node.father.as_deref()),
        ("mother", node.mother_name.as_deref(), node.mother.as_deref()),
    ];
    let present: Vec<_> = parents
        .into_iter()
        .filter(|(_, name, resolved)| name.is_some() || resolved.is_some())
        .collect();
    for (index, (role, name, resolved)) in present.iter().enumerate() {
        let last = index + 1 == present.len();
        let (branch, indent) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };
        match resolved {
            Some(parent) => {
                let _ = writeln!(out, "{}{}{}: {}", prefix, branch, role, describe(parent));
                render_parents(parent, &format!("{}{}", prefix, indent), out);
            }
            None => {
                let _ = writeln!(out, "{}{}{}: {}", prefix, branch, role, name.unwrap_or("?"));
            }
        }
    }
}

/// Renders a resolved tree as indented text, one horse per line.
///
/// Parents whose name is recorded but who were not expanded show the name only.
pub fn render_tree(root: &GenealogyNode) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", describe(root));
    render_parents(root, "", &mut out);
    out
}

/// Handles the genealogy command.
pub async fn handle_genealogy_command(
    args: &[String],
    client: &http_utils::EquideClient,
    json: bool,
) {
    let args = parse_genealogy_args(args).unwrap_or_else(|e| match e.usage_hint {
        Some(hint) => cli_utils::exit_with_usage_error(&e.message, &hint),
        None => cli_utils::exit_with_error(&e.message),
    });

    let query = args.query();
    let segments = ["genealogy", args.name.as_str()];
    let response: GenealogyResponse =
        http_utils::execute_or_exit(|| client.get(&segments, &query, "genealogy")).await;

    if json {
        cli_utils::print_json_or_exit(&response, "genealogy");
    } else {
        print!("{}", render_tree(&response.genealogy));
        println!(
            "{} horses over {} generations (depth {}, {})",
            response.horses, response.generations, response.depth, response.mode
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn node(name: &str, father: Option<&str>, mother: Option<&str>) -> GenealogyNode {
        GenealogyNode {
            name: name.to_string(),
            id: None,
            source: RecordSource::Canonical,
            sex: Some("M".to_string()),
            color: Some("BAI".to_string()),
            breed: None,
            birth_year: Some(2000),
            breeder: None,
            reference_link: None,
            father_name: father.map(str::to_string),
            mother_name: mother.map(str::to_string),
            father: None,
            mother: None,
        }
    }

    #[test]
    fn parse_all_options() {
        let args = parse_genealogy_args(&strings(&[
            "ready cash",
            "--depth",
            "3",
            "--id",
            "42",
            "--age-window",
        ]))
        .unwrap();
        assert_eq!(args.name.as_str(), "READY CASH");
        assert_eq!(args.depth.map(Depth::get), Some(3));
        assert_eq!(args.id, Some(42));
        assert_eq!(args.mode, ResolutionMode::AgeWindow);
        assert_eq!(
            args.query(),
            vec![
                ("mode", "age-window".to_string()),
                ("depth", "3".to_string()),
                ("id", "42".to_string()),
            ]
        );
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(parse_genealogy_args(&[]).is_err());
        assert!(parse_genealogy_args(&strings(&["A", "B"])).is_err());
        assert!(parse_genealogy_args(&strings(&["A", "--id", "x"])).is_err());
        assert!(parse_genealogy_args(&strings(&["A", "--depth"])).is_err());
        assert!(parse_genealogy_args(&strings(&["A", "--fast"])).is_err());
        let too_deep = parse_genealogy_args(&strings(&["A", "--depth", "11"])).unwrap_err();
        assert!(too_deep.message.starts_with("Invalid depth"));
        assert!(parse_genealogy_args(&strings(&["  "])).is_err());
    }

    #[test]
    fn tree_rendering() {
        let mut root = node("FOAL", Some("SIRE"), Some("DAM"));
        root.id = Some(1);
        root.father = Some(Box::new(node("SIRE", Some("GRANDSIRE"), None)));
        let rendered = render_tree(&root);
        assert_eq!(
            rendered,
            "FOAL (#1) 2000 M BAI\n\
             ├── father: SIRE 2000 M BAI\n\
             │   └── father: GRANDSIRE\n\
             └── mother: DAM\n"
        );
    }

    #[test]
    fn fallback_nodes_are_marked() {
        let mut partial = node("RUNNER", None, None);
        partial.source = RecordSource::Fallback;
        partial.birth_year = None;
        assert_eq!(render_tree(&partial), "RUNNER ? M BAI [participations]\n");
    }
}
