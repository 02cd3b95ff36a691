//! Decoding of librrd info lists.
//!
//! `rrd_info_r`, `rrdc_info` and `rrd_graph_v` return a flat list of
//! `(key, typed value)` entries. Keys encode structure with brackets:
//!
//! ```text
//! filename               = "load.rrd"         -> scalar
//! ds[load].type          = "GAUGE"            -> map   ds.type  { load: .. }
//! rra[0].cf              = "AVERAGE"          -> list  rra.cf   [ .. ]
//! image                  = <blob>             -> scalar, repeated blobs concatenated
//! ```
//!
//! [`Info`] folds the flat list into that shape.

use std::collections::BTreeMap;

use serde::Serialize;

/// A typed info value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InfoValue {
    /// `RD_I_VAL`
    Value(f64),
    /// `RD_I_CNT`
    Count(u64),
    /// `RD_I_STR`
    String(String),
    /// `RD_I_INT`
    Int(i64),
    /// `RD_I_BLO`
    Blob(Vec<u8>),
}

impl InfoValue {
    /// Numeric view of `Value`, `Count` and `Int`.
    #[allow(clippy::cast_precision_loss)] // info counters are well below 2^53
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            Self::Count(c) => Some(*c as f64),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Unsigned view of `Count` and non-negative `Int`.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Count(c) => Some(*c),
            Self::Int(i) => u64::try_from(*i).ok(),
            _ => None,
        }
    }

    /// String view of `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Byte view of `Blob`.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Blob(b) => Some(b),
            _ => None,
        }
    }
}

/// One raw entry of an info list.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoEntry {
    /// Bracketed key as returned by the library.
    pub key: String,
    /// The value.
    pub value: InfoValue,
}

impl InfoEntry {
    /// Convenience constructor.
    pub fn new(key: impl Into<String>, value: InfoValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// A node of the folded info tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InfoNode {
    /// Plain key.
    Scalar(InfoValue),
    /// Numerically indexed key; holes are `None`.
    List(Vec<Option<InfoValue>>),
    /// Key indexed by name.
    Map(BTreeMap<String, InfoValue>),
}

/// Splits an info key into `(name, subkey, index)`.
///
/// The first bracketed part is removed from the name and returned as the
/// subkey. It is also returned as an index when it is a number and the name
/// does not start with `ds.` (data sources are always keyed by name).
///
/// ```
/// use rrdbind::info::parse_info_key;
///
/// assert_eq!(parse_info_key("rra[2].cf"), ("rra.cf".to_string(), "2".to_string(), Some(2)));
/// assert_eq!(parse_info_key("ds[load].type"), ("ds.type".to_string(), "load".to_string(), None));
/// assert_eq!(parse_info_key("step"), ("step".to_string(), String::new(), None));
/// ```
pub fn parse_info_key(key: &str) -> (String, String, Option<usize>) {
    let Some(open) = key.find('[') else {
        return (key.to_string(), String::new(), None);
    };
    let Some(close) = key[open + 1..].find(']').map(|c| c + open + 1) else {
        return (key.to_string(), String::new(), None);
    };

    let name = format!("{}{}", &key[..open], &key[close + 1..]);
    let subkey = key[open + 1..close].to_string();
    if name.starts_with("ds.") {
        return (name, subkey, None);
    }
    let index = subkey.parse::<usize>().ok();
    (name, subkey, index)
}

/// Merges a new value into a slot; blobs accumulate.
fn merge(old: Option<InfoValue>, new: InfoValue) -> InfoValue {
    match (old, new) {
        (Some(InfoValue::Blob(mut acc)), InfoValue::Blob(more)) => {
            acc.extend_from_slice(&more);
            InfoValue::Blob(acc)
        }
        (_, new) => new,
    }
}

/// Largest list an indexed key may grow; higher indices are kept as map keys.
pub const MAX_LIST_LEN: usize = 1 << 16;

/// Folded info tree, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Info {
    nodes: BTreeMap<String, InfoNode>,
}

impl Info {
    /// Folds a flat entry list into a tree.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = InfoEntry>,
    {
        let mut nodes: BTreeMap<String, InfoNode> = BTreeMap::new();

        for entry in entries {
            let (name, subkey, index) = parse_info_key(&entry.key);
            let existing = nodes.remove(&name);

            // Indices past the cap, or under a name already keyed, stay keyed.
            let index = index.filter(|&i| {
                i < MAX_LIST_LEN && !matches!(existing, Some(InfoNode::Map(_)))
            });

            let node = match (index, subkey.is_empty()) {
                (Some(index), _) => {
                    let mut list = match existing {
                        Some(InfoNode::List(list)) => list,
                        _ => Vec::new(),
                    };
                    if list.len() <= index {
                        list.resize(index + 1, None);
                    }
                    let old = list[index].take();
                    list[index] = Some(merge(old, entry.value));
                    InfoNode::List(list)
                }
                (None, false) => {
                    let mut map = match existing {
                        Some(InfoNode::Map(map)) => map,
                        Some(InfoNode::List(list)) => list
                            .into_iter()
                            .enumerate()
                            .filter_map(|(i, v)| Some((i.to_string(), v?)))
                            .collect(),
                        _ => BTreeMap::new(),
                    };
                    let old = map.remove(&subkey);
                    map.insert(subkey, merge(old, entry.value));
                    InfoNode::Map(map)
                }
                (None, true) => {
                    let old = match existing {
                        Some(InfoNode::Scalar(v)) => Some(v),
                        _ => None,
                    };
                    InfoNode::Scalar(merge(old, entry.value))
                }
            };
            nodes.insert(name, node);
        }

        Self { nodes }
    }

    /// Returns the node called `name`.
    pub fn get(&self, name: &str) -> Option<&InfoNode> {
        self.nodes.get(name)
    }

    /// Returns the scalar called `name`.
    pub fn scalar(&self, name: &str) -> Option<&InfoValue> {
        match self.nodes.get(name)? {
            InfoNode::Scalar(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the list called `name`.
    pub fn list(&self, name: &str) -> Option<&[Option<InfoValue>]> {
        match self.nodes.get(name)? {
            InfoNode::List(l) => Some(l),
            _ => None,
        }
    }

    /// Returns the map called `name`.
    pub fn map(&self, name: &str) -> Option<&BTreeMap<String, InfoValue>> {
        match self.nodes.get(name)? {
            InfoNode::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Iterates over `(name, node)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &InfoNode)> {
        self.nodes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of top-level names.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Renders the tree as JSON. Blobs become byte arrays.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Summary of a `graphv` render.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphInfo {
    /// Output of `PRINT` items, in order.
    pub print: Vec<String>,
    /// Width of the whole image in pixels.
    pub width: u64,
    /// Height of the whole image in pixels.
    pub height: u64,
    /// Lower bound of the value axis.
    pub ymin: f64,
    /// Upper bound of the value axis.
    pub ymax: f64,
}

impl GraphInfo {
    /// Extracts the summary and the rendered image bytes.
    pub fn from_info(info: &Info) -> (Self, Vec<u8>) {
        let print = info
            .list("print")
            .map(|l| {
                l.iter()
                    .map(|v| v.as_ref().and_then(InfoValue::as_str).unwrap_or_default().to_string())
                    .collect()
            })
            .unwrap_or_default();
        let count = |name: &str| info.scalar(name).and_then(InfoValue::as_u64).unwrap_or(0);
        let value = |name: &str| info.scalar(name).and_then(InfoValue::as_f64).unwrap_or(f64::NAN);

        let graph = Self {
            print,
            width: count("image_width"),
            height: count("image_height"),
            ymin: value("value_min"),
            ymax: value("value_max"),
        };
        let image = info
            .scalar("image")
            .and_then(InfoValue::as_bytes)
            .map(<[u8]>::to_vec)
            .unwrap_or_default();
        (graph, image)
    }
}
