// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::Attributes;

/// Cost multipliers of an edge for a mode of travel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeFactor {
    /// Multiplier of the length when traversing the edge in the direction
    /// it was added in. Zero if the edge can't be traversed that way.
    pub forward: f64,

    /// Multiplier of the length when traversing the edge against the direction
    /// it was added in. Zero if the edge can't be traversed that way.
    pub backward: f64,

    /// Whether routes may start or end on the edge.
    pub can_stop: bool,
}

impl EdgeFactor {
    pub const NONE: Self = Self {
        forward: 0.0,
        backward: 0.0,
        can_stop: false,
    };

    pub fn in_direction(&self, forward: bool) -> f64 {
        if forward {
            self.forward
        } else {
            self.backward
        }
    }
}

/// Profile describes how edge attributes are interpreted for a mode of travel.
pub trait Profile: Send + Sync {
    /// Name of the profile, identifying it e.g. in per-profile island state.
    fn name(&self) -> &str;

    /// Computes the cost multipliers of an edge with given attributes.
    fn factor(&self, attributes: &Attributes) -> EdgeFactor;

    /// Multiplier of turn costs from a table with given attributes.
    /// Zero makes the table (including its prohibitions) not apply.
    fn turn_cost_factor(&self, attributes: &Attributes) -> f64;

    /// Keys of all edge attributes read by [Profile::factor].
    ///
    /// Edges with equal values under these keys must get equal factors;
    /// see [EdgeTypeMap::for_keys](crate::EdgeTypeMap::for_keys).
    fn attribute_keys(&self) -> Vec<String>;
}

/// Describes how to interpret OpenStreetMap-style edge attributes for routing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TagProfile<'a> {
    /// Human readable name of the routing profile,
    /// customary the most specific [access tag](https://wiki.openstreetmap.org/wiki/Key:access).
    ///
    /// When set to "foot", `oneway` tags are ignored (only `oneway:foot` is considered,
    /// except on footways, paths, steps and platforms), and only `restriction:foot`
    /// turn restrictions apply.
    pub name: &'a str,

    /// Attributes of routable edges.
    ///
    /// An edge is matched against all [Penalty] objects in order, and
    /// once an exact key and value match is found, the edge is routable
    /// with its length multiplied by the penalty. Edges matching no
    /// penalty are not routable.
    ///
    /// All penalties must be finite and not less than one.
    pub penalties: &'a [Penalty<'a>],

    /// [Access tags](https://wiki.openstreetmap.org/wiki/Key:access#Land-based_transportation),
    /// in order from least to most specific, to consider when checking for prohibitions.
    ///
    /// Also used to find mode-specific one-way tags and turn restrictions
    /// (see [TagProfile::is_allowed], [TagProfile::way_direction] and [TagProfile::is_exempted]).
    pub access: &'a [&'a str],

    /// Force no routing over [motorroad=yes](https://wiki.openstreetmap.org/wiki/Key:motorroad) edges.
    pub disallow_motorroad: bool,

    /// Force ignoring of turn restrictions.
    pub disable_restrictions: bool,
}

/// Numeric multiplier for edges with a specific attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penalty<'a> {
    pub key: &'a str,
    pub value: &'a str,

    /// Multiplier of the length, to express preference for a specific kind of edge.
    pub penalty: f64,
}

impl<'a> Penalty<'a> {
    pub const fn new(key: &'a str, value: &'a str, penalty: f64) -> Self {
        Self {
            key,
            value,
            penalty,
        }
    }
}

/// Turn restriction kind indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRestriction {
    /// Not a turn restriction, or a turn restriction which does not apply for the current profile.
    Inapplicable,

    /// The indicated maneuver is prohibited.
    Prohibitory,

    /// The indicated maneuver is the only one allowed.
    Mandatory,
}

fn get<'t>(attributes: &'t Attributes, key: &str) -> Option<&'t str> {
    attributes.get(key).map(|v| v.as_str())
}

impl<'a> TagProfile<'a> {
    /// Finds the first matching [Penalty] for an edge with given attributes.
    /// If there is no matching penalty, or if the edge is disallowed
    /// by the access tags (as determined by [TagProfile::is_allowed]),
    /// returns [f64::INFINITY].
    pub fn way_penalty(&self, attributes: &Attributes) -> f64 {
        let penalty = self
            .penalties
            .iter()
            .find(|p| get(attributes, p.key) == Some(p.value))
            .map_or(f64::INFINITY, |p| p.penalty);

        if !penalty.is_normal() || !self.is_allowed(attributes) {
            return f64::INFINITY;
        }
        return penalty;
    }

    /// Checks if the edge is routable, by considering motor roads ([TagProfile::disallow_motorroad])
    /// and access tags ([TagProfile::access]).
    pub fn is_allowed(&self, attributes: &Attributes) -> bool {
        if self.disallow_motorroad && get(attributes, "motorroad") == Some("yes") {
            return false;
        }

        !matches!(
            self.access.iter().rev().find_map(|&mode| get(attributes, mode)),
            Some("no") | Some("private")
        )
    }

    /// Checks if an edge is traversable forward (first return value) and
    /// backwards (second return value) by investigating mode-specific and generic one-way tags.
    ///
    /// Motorways, motorway links and roundabouts default to being one-way,
    /// except if overridden by specific tags.
    pub fn way_direction(&self, attributes: &Attributes) -> (bool, bool) {
        let mut forward = true;
        let mut backward = true;

        if !self.apply_foot_exceptions() {
            if matches!(get(attributes, "highway"), Some("motorway") | Some("motorway_link")) {
                backward = false;
            }
            if matches!(get(attributes, "junction"), Some("roundabout") | Some("circular")) {
                backward = false;
            }
        }

        match self.active_oneway_value(attributes) {
            "yes" | "true" | "1" => {
                forward = true;
                backward = false;
            }

            "-1" | "reverse" => {
                forward = false;
                backward = true;
            }

            "no" => {
                forward = true;
                backward = true;
            }

            _ => {}
        }

        return (forward, backward);
    }

    /// Returns the value of the most specific "oneway:MODE" tag (based on [TagProfile::access]),
    /// falling back to simply "oneway", and returning an empty string if no relevant tag was found.
    fn active_oneway_value<'t>(&self, attributes: &'t Attributes) -> &'t str {
        if self.apply_foot_exceptions() {
            if let Some(oneway_foot) = get(attributes, "oneway:foot") {
                return oneway_foot;
            }
            if Self::generic_oneway_applies_on_foot(attributes) {
                return get(attributes, "oneway").unwrap_or("");
            }
            return "";
        }

        self.access
            .iter()
            .rev()
            .filter(|&&mode| mode != "access")
            .find_map(|&mode| get(attributes, &format!("oneway:{mode}")))
            .or_else(|| get(attributes, "oneway"))
            .unwrap_or("")
    }

    fn generic_oneway_applies_on_foot(attributes: &Attributes) -> bool {
        matches!(
            get(attributes, "highway"),
            Some("footway") | Some("path") | Some("steps") | Some("platform")
        ) || get(attributes, "public_transport") == Some("platform")
            || get(attributes, "railway") == Some("platform")
    }

    /// Figures out what kind of [TurnRestriction] a turn cost table with given attributes represents.
    pub fn restriction_kind(&self, attributes: &Attributes) -> TurnRestriction {
        if self.disable_restrictions
            || get(attributes, "type") != Some("restriction")
            || self.is_exempted(attributes)
        {
            return TurnRestriction::Inapplicable;
        }

        let (kind, description) = self
            .active_restriction_value(attributes)
            .split_once('_')
            .unwrap_or(("", ""));

        if !matches!(description, "right_turn" | "left_turn" | "u_turn" | "straight_on") {
            return TurnRestriction::Inapplicable;
        }

        return match kind {
            "no" => TurnRestriction::Prohibitory,
            "only" => TurnRestriction::Mandatory,
            _ => TurnRestriction::Inapplicable,
        };
    }

    /// Returns true if [TagProfile::access] intersects with any mode present in the `except` tag.
    /// If the tag is missing, returns false.
    pub fn is_exempted(&self, attributes: &Attributes) -> bool {
        get(attributes, "except")
            .unwrap_or("")
            .split(';')
            .any(|exempted| self.access.contains(&exempted))
    }

    fn active_restriction_value<'t>(&self, attributes: &'t Attributes) -> &'t str {
        if self.apply_foot_exceptions() {
            return get(attributes, "restriction:foot").unwrap_or("");
        }

        self.access
            .iter()
            .rev()
            .filter(|&&mode| mode != "access")
            .find_map(|&mode| get(attributes, &format!("restriction:{mode}")))
            .or_else(|| get(attributes, "restriction"))
            .unwrap_or("")
    }

    fn apply_foot_exceptions(&self) -> bool {
        self.name == "foot"
    }
}

impl Profile for TagProfile<'_> {
    fn name(&self) -> &str {
        self.name
    }

    fn factor(&self, attributes: &Attributes) -> EdgeFactor {
        let penalty = self.way_penalty(attributes);
        if !penalty.is_finite() {
            return EdgeFactor::NONE;
        }

        let (forward, backward) = self.way_direction(attributes);
        EdgeFactor {
            forward: if forward { penalty } else { 0.0 },
            backward: if backward { penalty } else { 0.0 },
            can_stop: true,
        }
    }

    /// Tables without a `type` attribute are plain turn costs, and always apply.
    /// Tables tagged as restrictions apply only if [TagProfile::restriction_kind] says so.
    fn turn_cost_factor(&self, attributes: &Attributes) -> f64 {
        if get(attributes, "type").is_none() {
            return 1.0;
        }

        match self.restriction_kind(attributes) {
            TurnRestriction::Inapplicable => 0.0,
            TurnRestriction::Prohibitory | TurnRestriction::Mandatory => 1.0,
        }
    }

    fn attribute_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = ["motorroad", "highway", "junction", "oneway"]
            .into_iter()
            .map(String::from)
            .collect();
        keys.extend(self.penalties.iter().map(|p| p.key.to_string()));
        for &mode in self.access {
            keys.push(mode.to_string());
            keys.push(format!("oneway:{mode}"));
        }
        if self.apply_foot_exceptions() {
            keys.extend(["public_transport", "railway"].map(String::from));
        }

        keys.sort();
        keys.dedup();
        keys
    }
}

/// Example routing [TagProfile] for cars, with high preference for faster roads
/// and with appropriate [access tags](https://wiki.openstreetmap.org/wiki/Key:access).
pub const CAR_PROFILE: TagProfile = TagProfile {
    name: "motorcar",
    penalties: &[
        Penalty::new("highway", "motorway", 1.0),
        Penalty::new("highway", "motorway_link", 1.0),
        Penalty::new("highway", "trunk", 2.0),
        Penalty::new("highway", "trunk_link", 2.0),
        Penalty::new("highway", "primary", 5.0),
        Penalty::new("highway", "primary_link", 5.0),
        Penalty::new("highway", "secondary", 6.5),
        Penalty::new("highway", "secondary_link", 6.5),
        Penalty::new("highway", "tertiary", 10.0),
        Penalty::new("highway", "tertiary_link", 10.0),
        Penalty::new("highway", "unclassified", 10.0),
        Penalty::new("highway", "minor", 10.0),
        Penalty::new("highway", "residential", 15.0),
        Penalty::new("highway", "living_street", 20.0),
        Penalty::new("highway", "track", 20.0),
        Penalty::new("highway", "service", 20.0),
    ],
    access: &["access", "vehicle", "motor_vehicle", "motorcar"],
    disallow_motorroad: false,
    disable_restrictions: false,
};

/// Example routing [TagProfile] for bicycles, with preferences for quieter roads.
pub const BICYCLE_PROFILE: TagProfile = TagProfile {
    name: "bicycle",
    penalties: &[
        Penalty::new("highway", "trunk", 50.0),
        Penalty::new("highway", "trunk_link", 50.0),
        Penalty::new("highway", "primary", 10.0),
        Penalty::new("highway", "primary_link", 10.0),
        Penalty::new("highway", "secondary", 3.0),
        Penalty::new("highway", "secondary_link", 3.0),
        Penalty::new("highway", "tertiary", 2.5),
        Penalty::new("highway", "tertiary_link", 2.5),
        Penalty::new("highway", "unclassified", 2.5),
        Penalty::new("highway", "minor", 2.5),
        Penalty::new("highway", "cycleway", 1.0),
        Penalty::new("highway", "residential", 1.0),
        Penalty::new("highway", "living_street", 1.5),
        Penalty::new("highway", "track", 2.0),
        Penalty::new("highway", "service", 2.0),
        Penalty::new("highway", "bridleway", 3.0),
        Penalty::new("highway", "footway", 3.0),
        Penalty::new("highway", "steps", 5.0),
        Penalty::new("highway", "path", 2.0),
    ],
    access: &["access", "vehicle", "bicycle"],
    disallow_motorroad: true,
    disable_restrictions: false,
};

/// Example routing [TagProfile] for walking, with preferences for quieter roads.
pub const FOOT_PROFILE: TagProfile = TagProfile {
    name: "foot",
    penalties: &[
        Penalty::new("highway", "trunk", 4.0),
        Penalty::new("highway", "trunk_link", 4.0),
        Penalty::new("highway", "primary", 2.0),
        Penalty::new("highway", "primary_link", 2.0),
        Penalty::new("highway", "secondary", 1.3),
        Penalty::new("highway", "secondary_link", 1.3),
        Penalty::new("highway", "tertiary", 1.2),
        Penalty::new("highway", "tertiary_link", 1.2),
        Penalty::new("highway", "unclassified", 1.2),
        Penalty::new("highway", "minor", 1.2),
        Penalty::new("highway", "residential", 1.2),
        Penalty::new("highway", "living_street", 1.2),
        Penalty::new("highway", "track", 1.2),
        Penalty::new("highway", "service", 1.2),
        Penalty::new("highway", "bridleway", 1.2),
        Penalty::new("highway", "footway", 1.05),
        Penalty::new("highway", "path", 1.05),
        Penalty::new("highway", "steps", 1.15),
        Penalty::new("highway", "pedestrian", 1.0),
        Penalty::new("highway", "platform", 1.1),
        Penalty::new("railway", "platform", 1.1),
        Penalty::new("public_transport", "platform", 1.1),
    ],
    access: &["access", "foot"],
    disallow_motorroad: true,
    disable_restrictions: false,
};
