use std::collections::HashSet;

use anyhow::{bail, Context, Result};

use crate::graph_utils::graph::{display_value, ViewNode};
use crate::persistence::persist::{load_overrides, save_overrides, StyleStore};
use crate::viz::extract::CountTable;
use crate::viz::host::{NodeAttribute, RenderingHost};
use crate::viz::style::{palette_color, LabelSource, LabelStyleOverrides, StyleEdit, StyleSet, ID_CAPTION, PALETTE};

/// Owns the per-label overrides and keeps them written through to the store.
pub struct StyleResolver<S: StyleStore> {
    store: S,
    overrides: LabelStyleOverrides,
    // Primary labels of the most recent ingestion pass
    current_labels: HashSet<String>,
}

impl<S: StyleStore> StyleResolver<S> {
    /// Start from whatever the store holds; corrupt content starts empty.
    pub fn load(store: S) -> Self {
        let overrides = load_overrides(&store);
        log::debug!("loaded styles for {} labels", overrides.len());
        Self { store, overrides, current_labels: HashSet::new() }
    }

    pub fn overrides(&self) -> &LabelStyleOverrides { &self.overrides }
    pub fn store(&self) -> &S { &self.store }

    pub fn has_label(&self, label: &str) -> bool {
        self.current_labels.contains(label)
    }

    /// Prune labels missing from this pass, give every colourless label the
    /// lowest palette slot no label of this pass already shows (first-seen
    /// order, wrapping once all slots are taken), then persist.
    pub fn resolve_labels(&mut self, label_counts: &CountTable) {
        let mut next = self.overrides.clone();
        let pruned = next.prune(|label| label_counts.contains(label));
        if !pruned.is_empty() {
            log::debug!("pruned styles for labels no longer present: {:?}", pruned);
        }

        let mut taken = [false; PALETTE.len()];
        for (_, style) in next.iter() {
            if let Some(slot) = style.color.and_then(|c| PALETTE.iter().position(|p| *p == c)) {
                taken[slot] = true;
            }
        }
        let mut wrapped = 0usize;
        for label in label_counts.keys() {
            let style = next.get(label).cloned().unwrap_or_default();
            if style.color.is_some() {
                continue;
            }
            let slot = match taken.iter().position(|t| !t) {
                Some(free) => {
                    taken[free] = true;
                    free
                }
                None => {
                    wrapped += 1;
                    wrapped - 1
                }
            };
            next.insert(label, style.applied(&StyleEdit::Color(palette_color(slot))));
        }

        if let Err(e) = save_overrides(&mut self.store, &next) {
            log::error!("failed to persist node styles: {:#}", e);
        }
        self.overrides = next;
        self.current_labels = label_counts.keys().map(str::to_string).collect();
    }

    /// Override fields layered over the computed default (no fields beyond the
    /// assigned colour; the host supplies the rest).
    pub fn effective_style(&self, label: &str) -> StyleSet {
        let computed = StyleSet::default();
        match self.overrides.get(label) {
            Some(ov) => ov.merged_over(&computed),
            None => computed,
        }
    }

    /// Stamp resolved styles and captions onto freshly extracted nodes.
    pub fn style_nodes(&self, nodes: &mut [ViewNode]) {
        for node in nodes {
            let style = match node.primary_label() {
                Some(label) => self.effective_style(label),
                None => StyleSet::default(),
            };
            node.caption = caption_for(node, &style);
            node.style = style;
        }
    }

    /// Apply user edits to one label. The new mapping is persisted before it
    /// replaces the current one; on failure nothing changes.
    pub fn apply_edits(&mut self, label: &str, edits: &[StyleEdit]) -> Result<StyleSet> {
        if !self.current_labels.contains(label) {
            bail!("label {} is not part of the current result set", label);
        }
        let current = self.overrides.get(label).cloned().unwrap_or_default();
        let updated = edits.iter().fold(current, |style, edit| style.applied(edit));

        let mut next = self.overrides.clone();
        next.insert(label, updated.clone());
        save_overrides(&mut self.store, &next).context("persisting node styles")?;
        self.overrides = next;
        Ok(updated)
    }

    /// Push the edited fields of `label` to every node already handed to the
    /// host. Returns the number of nodes touched.
    pub fn repush_label<H: RenderingHost + ?Sized>(
        &self,
        label: &str,
        nodes: &mut [ViewNode],
        edits: &[StyleEdit],
        host: &mut H,
    ) -> usize {
        let style = self.effective_style(label);
        let mut touched = 0usize;
        for node in nodes.iter_mut().filter(|n| n.primary_label() == Some(label)) {
            node.style = style.clone();
            for edit in edits {
                let attribute = match edit {
                    StyleEdit::Color(c) => NodeAttribute::Color(*c),
                    StyleEdit::Shape(s) => NodeAttribute::Shape(*s),
                    StyleEdit::Size(v) => NodeAttribute::Size(*v),
                    StyleEdit::FontSize(v) => NodeAttribute::FontSize(*v),
                    StyleEdit::Label(_) => {
                        node.caption = caption_for(node, &style);
                        NodeAttribute::Caption(node.caption.clone())
                    }
                };
                host.set_node_attribute(&node.id, attribute);
            }
            touched += 1;
        }
        touched
    }
}

/// Caption text: the chosen property if the node has it, the id for `#id`,
/// otherwise the colon-joined label string.
pub fn caption_for(node: &ViewNode, style: &StyleSet) -> String {
    match &style.label_source {
        Some(LabelSource::Property(key)) => match node.properties.get(key) {
            Some(value) => display_value(value),
            None => node.label.clone(),
        },
        Some(LabelSource::Id) => match node.properties.get(ID_CAPTION) {
            Some(value) => display_value(value),
            None => node.id.clone(),
        },
        None => node.label.clone(),
    }
}
