use crate::orm::field::Field;
use std::collections::VecDeque;
use std::sync::Arc;

/// Resolved, ordered field list of a collection type.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    own: Vec<(&'static str, Field)>,
    /// Every ancestor once, nearest first: a schema always precedes its own ancestors.
    lineage: Vec<Arc<Schema>>,
    fields: Vec<(&'static str, Field)>,
}

impl Schema {
    /// Own fields first, then the fields declared on each ancestor in linearized order.
    /// The first occurrence of a name wins, so a nearer declaration overrides a farther
    /// one even when two parents share an ancestor.
    pub fn resolve(own: Vec<(&'static str, Field)>, ancestors: &[Arc<Schema>]) -> Self {
        let lineage = linearize(ancestors);
        let mut fields: Vec<(&'static str, Field)> = Vec::new();
        let declared = own.iter().chain(lineage.iter().flat_map(|a| a.own.iter()));
        for (name, field) in declared {
            if fields.iter().any(|(n, _)| n == name) {
                continue;
            }
            fields.push((*name, field.clone()));
        }
        Schema {
            own,
            lineage,
            fields,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| *n == name)
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, f)| f)
    }

    /// Interned name for `name`, if declared.
    pub(crate) fn name_of(&self, name: &str) -> Option<&'static str> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(n, _)| *n)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(n, _)| *n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Field)> + '_ {
        self.fields.iter().map(|(n, f)| (*n, f))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// C3 merge of the parents' lineages, identity by pointer. An inconsistent hierarchy
/// falls back to taking the next head in parent order.
fn linearize(parents: &[Arc<Schema>]) -> Vec<Arc<Schema>> {
    let mut seqs: Vec<VecDeque<Arc<Schema>>> = parents
        .iter()
        .map(|p| std::iter::once(p).chain(p.lineage.iter()).cloned().collect())
        .collect();
    seqs.push(parents.iter().cloned().collect());

    let mut out = Vec::new();
    loop {
        seqs.retain(|s| !s.is_empty());
        let Some(first) = seqs.first().and_then(|s| s.front()) else {
            return out;
        };
        let in_tail =
            |c: &Arc<Schema>| seqs.iter().any(|s| s.iter().skip(1).any(|x| Arc::ptr_eq(x, c)));
        let head = seqs
            .iter()
            .filter_map(|s| s.front())
            .find(|&c| !in_tail(c))
            .unwrap_or(first)
            .clone();
        for s in &mut seqs {
            s.retain(|x| !Arc::ptr_eq(x, &head));
        }
        out.push(head);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::Bson;

    #[test]
    fn own_fields_keep_declaration_order() {
        let schema = Schema::resolve(vec![("b", Field::new()), ("a", Field::new())], &[]);
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn nearer_ancestor_wins_on_collision() {
        let near = Arc::new(Schema::resolve(vec![("name", Field::with_default("near"))], &[]));
        let far = Arc::new(Schema::resolve(
            vec![("foo", Field::new()), ("name", Field::with_default("far"))],
            &[],
        ));
        let schema = Schema::resolve(vec![], &[near, far]);
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["name", "foo"]);
        assert_eq!(
            schema.get("name").unwrap().default_value(),
            Bson::String("near".into())
        );
    }

    #[test]
    fn own_declaration_overrides_ancestor() {
        let parent = Arc::new(Schema::resolve(vec![("age", Field::with_default(1))], &[]));
        let schema = Schema::resolve(vec![("age", Field::with_default(2))], &[parent]);
        assert_eq!(schema.len(), 1);
        assert_eq!(schema.get("age").unwrap().default_value(), Bson::Int32(2));
    }

    #[test]
    fn diamond_prefers_nearer_override_of_shared_base() {
        let base = Arc::new(Schema::resolve(
            vec![("x", Field::with_default("base")), ("y", Field::new())],
            &[],
        ));
        let left = Arc::new(Schema::resolve(vec![("a", Field::new())], &[base.clone()]));
        let right = Arc::new(Schema::resolve(
            vec![("x", Field::with_default("right"))],
            &[base.clone()],
        ));
        let schema = Schema::resolve(vec![("d", Field::new())], &[left, right]);
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["d", "a", "x", "y"]);
        assert_eq!(schema.get("x").unwrap().default_value(), Bson::String("right".into()));
    }

    #[test]
    fn shared_ancestor_is_visited_once_after_its_children() {
        let base = Arc::new(Schema::resolve(vec![("id", Field::new())], &[]));
        let left = Arc::new(Schema::resolve(vec![("l", Field::new())], &[base.clone()]));
        let right = Arc::new(Schema::resolve(vec![("r", Field::new())], &[base.clone()]));
        let lineage = linearize(&[left.clone(), right.clone()]);
        assert_eq!(lineage.len(), 3);
        assert!(Arc::ptr_eq(&lineage[0], &left));
        assert!(Arc::ptr_eq(&lineage[1], &right));
        assert!(Arc::ptr_eq(&lineage[2], &base));
    }
}
