//! Turn-by-turn instructions
//!
//! Maneuvers are derived from the route's legs: a depart, a turn wherever
//! the bearing change at a decision point reaches the configured threshold,
//! a continue where the street name changes, a single instruction per
//! roundabout, and an arrive. Wording comes from a [`LanguageFormatter`].
//!
//! A route that starts on a roundabout gets an exit instruction where it
//! leaves; one that ends on a roundabout is told to enter it, with no exit.

use serde::{Deserialize, Serialize};

use crate::config::InstructionConfig;
use crate::geo::{bearing, turn_angle};
use crate::graph::{EdgeId, GraphStore, NodeId};
use crate::profile::{is_roundabout, ProfileTable, TagLookup};
use crate::route::{Route, RouteLeg};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnDirection {
    SlightLeft,
    Left,
    SharpLeft,
    SlightRight,
    Right,
    SharpRight,
    UTurn,
}

impl TurnDirection {
    /// Classify a signed turn angle (positive = right)
    pub fn from_angle(angle: f64) -> Self {
        let a = angle.abs();
        let right = angle > 0.0;
        match (a, right) {
            (a, _) if a >= 170.0 => TurnDirection::UTurn,
            (a, true) if a >= 120.0 => TurnDirection::SharpRight,
            (a, false) if a >= 120.0 => TurnDirection::SharpLeft,
            (a, true) if a >= 60.0 => TurnDirection::Right,
            (a, false) if a >= 60.0 => TurnDirection::Left,
            (_, true) => TurnDirection::SlightRight,
            (_, false) => TurnDirection::SlightLeft,
        }
    }
}

/// Eight-point compass heading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Heading {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Heading {
    pub fn from_bearing(bearing: f64) -> Self {
        const HEADINGS: [Heading; 8] = [
            Heading::North,
            Heading::NorthEast,
            Heading::East,
            Heading::SouthEast,
            Heading::South,
            Heading::SouthWest,
            Heading::West,
            Heading::NorthWest,
        ];
        let normalized = bearing.rem_euclid(360.0);
        let sector = ((normalized + 22.5) / 45.0) as usize % 8;
        HEADINGS[sector]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Maneuver {
    Depart { heading: Heading },
    Continue,
    Turn { direction: TurnDirection },
    Roundabout { exit: u32 },
    /// Leave a roundabout the route started on
    ExitRoundabout { exit: u32 },
    /// Enter a roundabout the destination lies on
    EnterRoundabout,
    Arrive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub text: String,
    /// Index of the route entry the instruction applies at
    pub entry: usize,
    pub maneuver: Maneuver,
}

/// Produces instruction text; swap in another implementation to localize
pub trait LanguageFormatter: Send + Sync {
    fn depart(&self, heading: Heading, street: Option<&str>) -> String;
    fn turn(&self, direction: TurnDirection, street: Option<&str>) -> String;
    fn continue_onto(&self, street: Option<&str>) -> String;
    fn roundabout(&self, exit: u32, street: Option<&str>) -> String;
    fn exit_roundabout(&self, exit: u32, street: Option<&str>) -> String;
    fn enter_roundabout(&self) -> String;
    fn arrive(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleEnglishFormatter;

impl SimpleEnglishFormatter {
    fn heading_name(heading: Heading) -> &'static str {
        match heading {
            Heading::North => "north",
            Heading::NorthEast => "northeast",
            Heading::East => "east",
            Heading::SouthEast => "southeast",
            Heading::South => "south",
            Heading::SouthWest => "southwest",
            Heading::West => "west",
            Heading::NorthWest => "northwest",
        }
    }

    fn ordinal(n: u32) -> String {
        let suffix = match (n % 10, n % 100) {
            (_, 11..=13) => "th",
            (1, _) => "st",
            (2, _) => "nd",
            (3, _) => "rd",
            _ => "th",
        };
        format!("{n}{suffix}")
    }
}

impl LanguageFormatter for SimpleEnglishFormatter {
    fn depart(&self, heading: Heading, street: Option<&str>) -> String {
        let heading = Self::heading_name(heading);
        match street {
            Some(s) => format!("Head {heading} on {s}"),
            None => format!("Head {heading}"),
        }
    }

    fn turn(&self, direction: TurnDirection, street: Option<&str>) -> String {
        let action = match direction {
            TurnDirection::SlightLeft => "Bear left",
            TurnDirection::Left => "Turn left",
            TurnDirection::SharpLeft => "Turn sharp left",
            TurnDirection::SlightRight => "Bear right",
            TurnDirection::Right => "Turn right",
            TurnDirection::SharpRight => "Turn sharp right",
            TurnDirection::UTurn => "Make a U-turn",
        };
        match street {
            Some(s) => format!("{action} onto {s}"),
            None => action.to_string(),
        }
    }

    fn continue_onto(&self, street: Option<&str>) -> String {
        match street {
            Some(s) => format!("Continue onto {s}"),
            None => "Continue".to_string(),
        }
    }

    fn roundabout(&self, exit: u32, street: Option<&str>) -> String {
        let exit = Self::ordinal(exit);
        match street {
            Some(s) => format!("At the roundabout, take the {exit} exit onto {s}"),
            None => format!("At the roundabout, take the {exit} exit"),
        }
    }

    fn exit_roundabout(&self, exit: u32, street: Option<&str>) -> String {
        let exit = Self::ordinal(exit);
        match street {
            Some(s) => format!("Take the {exit} exit onto {s}"),
            None => format!("Take the {exit} exit"),
        }
    }

    fn enter_roundabout(&self) -> String {
        "Enter the roundabout".to_string()
    }

    fn arrive(&self) -> String {
        "You have arrived at your destination".to_string()
    }
}

/// Instructions for `route`, in route order
pub fn generate_instructions(
    graph: &GraphStore,
    table: &ProfileTable,
    route: &Route,
    formatter: &dyn LanguageFormatter,
    config: &InstructionConfig,
) -> Vec<Instruction> {
    let Some(last_entry) = route.entries.len().checked_sub(1) else {
        return Vec::new();
    };

    let street = |leg: &RouteLeg| street_name(graph, leg.edge);
    let in_roundabout = |leg: &RouteLeg| {
        is_roundabout(&TagLookup::interned(graph.tags().resolve(graph.edge(leg.edge).tags)))
    };
    let coord = |i: usize| route.entries[i].coordinate;

    let mut out = Vec::new();

    let heading = route
        .legs
        .first()
        .map_or(0.0, |leg| bearing(coord(leg.first_entry), coord(leg.first_entry + 1)));
    let first_street = route.legs.first().and_then(street);
    out.push(Instruction {
        text: formatter.depart(Heading::from_bearing(heading), first_street),
        entry: 0,
        maneuver: Maneuver::Depart {
            heading: Heading::from_bearing(heading),
        },
    });

    let legs = &route.legs;
    let mut i = 0;
    while i < legs.len() {
        let cur = &legs[i];

        if in_roundabout(cur) {
            // Ride the whole roundabout
            let mut j = i;
            while j < legs.len() && in_roundabout(&legs[j]) {
                j += 1;
            }

            match legs.get(j) {
                Some(exit_leg) => {
                    // Ways out passed, the one taken included
                    let passed = legs[i..j]
                        .iter()
                        .filter(|leg| has_exit(graph, table, graph.edge(leg.edge).to, leg.edge))
                        .count();
                    let exit = u32::try_from(passed).unwrap_or(u32::MAX).max(1);
                    let exit_street = street(exit_leg);
                    out.push(if i == 0 {
                        Instruction {
                            text: formatter.exit_roundabout(exit, exit_street),
                            entry: exit_leg.first_entry,
                            maneuver: Maneuver::ExitRoundabout { exit },
                        }
                    } else {
                        Instruction {
                            text: formatter.roundabout(exit, exit_street),
                            entry: cur.first_entry,
                            maneuver: Maneuver::Roundabout { exit },
                        }
                    });
                }
                // Arrive follows; a route that never leaves needs nothing more
                None if i > 0 => out.push(Instruction {
                    text: formatter.enter_roundabout(),
                    entry: cur.first_entry,
                    maneuver: Maneuver::EnterRoundabout,
                }),
                None => {}
            }
            i = j + 1;
            continue;
        }

        let Some(prev) = i.checked_sub(1).map(|p| &legs[p]) else {
            i += 1;
            continue;
        };

        let node = graph.edge(prev.edge).to;
        let incoming = bearing(coord(prev.last_entry - 1), coord(prev.last_entry));
        let outgoing = bearing(coord(cur.first_entry), coord(cur.first_entry + 1));
        let angle = turn_angle(incoming, outgoing);

        let prev_street = street(prev);
        let cur_street = street(cur);

        if angle.abs() >= config.turn_angle_threshold_deg
            && onward_options(graph, table, node, prev.edge) > 1
        {
            let direction = TurnDirection::from_angle(angle);
            out.push(Instruction {
                text: formatter.turn(direction, cur_street),
                entry: cur.first_entry,
                maneuver: Maneuver::Turn { direction },
            });
        } else if cur_street.is_some() && cur_street != prev_street {
            out.push(Instruction {
                text: formatter.continue_onto(cur_street),
                entry: cur.first_entry,
                maneuver: Maneuver::Continue,
            });
        }

        i += 1;
    }

    out.push(Instruction {
        text: formatter.arrive(),
        entry: last_entry,
        maneuver: Maneuver::Arrive,
    });

    out
}

fn street_name(graph: &GraphStore, edge: EdgeId) -> Option<&str> {
    let tags = graph.tags().resolve(graph.edge(edge).tags);
    tags.get("name").or_else(|| tags.get("ref"))
}

/// Edges the profile may take at `node` after arriving over `incoming`,
/// not counting the way back
fn onward_options(graph: &GraphStore, table: &ProfileTable, node: NodeId, incoming: EdgeId) -> usize {
    let back = graph.twin(incoming);
    graph
        .out_edges(node)
        .filter(|&(id, _)| Some(id) != back && graph.edge_cost(table, id).traversable)
        .count()
}

/// Whether a roundabout node offers a usable way out of the roundabout
fn has_exit(graph: &GraphStore, table: &ProfileTable, node: NodeId, incoming: EdgeId) -> bool {
    let back = graph.twin(incoming);
    graph.out_edges(node).any(|(id, edge)| {
        Some(id) != back
            && graph.edge_cost(table, id).traversable
            && !is_roundabout(&TagLookup::interned(graph.tags().resolve(edge.tags)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_classes() {
        assert_eq!(TurnDirection::from_angle(35.0), TurnDirection::SlightRight);
        assert_eq!(TurnDirection::from_angle(-59.9), TurnDirection::SlightLeft);
        assert_eq!(TurnDirection::from_angle(90.0), TurnDirection::Right);
        assert_eq!(TurnDirection::from_angle(-90.0), TurnDirection::Left);
        assert_eq!(TurnDirection::from_angle(135.0), TurnDirection::SharpRight);
        assert_eq!(TurnDirection::from_angle(-169.0), TurnDirection::SharpLeft);
        assert_eq!(TurnDirection::from_angle(175.0), TurnDirection::UTurn);
        assert_eq!(TurnDirection::from_angle(-180.0), TurnDirection::UTurn);
    }

    #[test]
    fn test_heading_sectors() {
        assert_eq!(Heading::from_bearing(0.0), Heading::North);
        assert_eq!(Heading::from_bearing(350.0), Heading::North);
        assert_eq!(Heading::from_bearing(44.0), Heading::NorthEast);
        assert_eq!(Heading::from_bearing(90.0), Heading::East);
        assert_eq!(Heading::from_bearing(200.0), Heading::South);
        assert_eq!(Heading::from_bearing(-90.0), Heading::West);
    }

    #[test]
    fn test_english_text() {
        let f = SimpleEnglishFormatter;
        assert_eq!(f.depart(Heading::East, Some("High Street")), "Head east on High Street");
        assert_eq!(f.turn(TurnDirection::Left, Some("Mill Lane")), "Turn left onto Mill Lane");
        assert_eq!(f.turn(TurnDirection::UTurn, None), "Make a U-turn");
        assert_eq!(f.continue_onto(Some("B1234")), "Continue onto B1234");
        assert_eq!(
            f.roundabout(2, Some("Station Road")),
            "At the roundabout, take the 2nd exit onto Station Road"
        );
        assert_eq!(f.roundabout(11, None), "At the roundabout, take the 11th exit");
        assert_eq!(f.exit_roundabout(3, Some("Mill Lane")), "Take the 3rd exit onto Mill Lane");
        assert_eq!(f.enter_roundabout(), "Enter the roundabout");
        assert_eq!(f.arrive(), "You have arrived at your destination");
    }

    #[test]
    fn test_maneuver_serialization() {
        let json = serde_json::to_string(&Maneuver::Turn {
            direction: TurnDirection::SharpLeft,
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"turn","direction":"sharp_left"}"#);
        assert_eq!(
            serde_json::to_string(&Maneuver::Arrive).unwrap(),
            r#"{"type":"arrive"}"#
        );
    }
}
