use crate::store::{AreaSource, NodeId, NodeKind, Registry};
use crate::units::format_number;
use std::collections::HashSet;
use std::fmt::Write;

/// Draws the network feeding `root` as an indented tree, one node per line.
///
/// Inflows are listed in registration order. A node that is already on the path being
/// printed is shown as `[cycle <name>]` and not expanded again; a node reached through
/// two separate branches is printed in full under each.
pub fn render_tree(registry: &Registry, root: NodeId) -> String {
    let mut printer = TreePrinter {
        registry,
        on_path: HashSet::new(),
        output: String::new(),
    };

    if registry.contains(root) {
        let _ = writeln!(printer.output, "{}", node_label(registry, root));
        printer.on_path.insert(root);
        printer.children(root, "");
    } else {
        let _ = writeln!(printer.output, "Error: Invalid Node ID {:?}", root);
    }
    printer.output
}

/// One-line description of a node and its parameters.
pub fn node_label(registry: &Registry, id: NodeId) -> String {
    let kind = registry.kind(id);
    let params = match kind {
        NodeKind::River(river) => {
            let area = match &river.area {
                AreaSource::Fixed(q) => q.to_string(),
                AreaSource::Dynamic(f) => f.describe(),
            };
            format!(
                "area={}, flow_days={}, flow_shape={}",
                area,
                format_number(river.flow_days),
                river.flow_shape.describe()
            )
        }
        NodeKind::Dam(dam) => format!("out_flow={}", dam.out_flow.describe()),
    };
    format!("{}: {} [ {} ]", kind.tag(), registry.name(id), params)
}

struct TreePrinter<'a> {
    registry: &'a Registry,
    on_path: HashSet<NodeId>,
    output: String,
}

impl<'a> TreePrinter<'a> {
    fn children(&mut self, node: NodeId, prefix: &str) {
        let inflows = self.registry.inflows(node);
        for (i, &child) in inflows.iter().enumerate() {
            let is_last = i == inflows.len() - 1;
            self.branch(child, prefix, is_last);
        }
    }

    fn branch(&mut self, node: NodeId, prefix: &str, is_last: bool) {
        let connector = if is_last { "`-- " } else { "|-- " };

        if self.on_path.contains(&node) {
            let _ = writeln!(self.output, "{}{}[cycle {}]", prefix, connector, self.registry.name(node));
            return;
        }

        let _ = writeln!(self.output, "{}{}{}", prefix, connector, node_label(self.registry, node));

        self.on_path.insert(node);
        let stem = format!("{}{}", prefix, if is_last { "    " } else { "|   " });
        self.children(node, &stem);
        self.on_path.remove(&node);
    }
}
