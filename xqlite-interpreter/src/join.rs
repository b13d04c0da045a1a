use std::hash::{BuildHasher, Hasher};

use ahash::{HashMap, HashMapExt};
use tracing::debug;
use xqlite_ast::{JoinVars, NodeId};

use crate::compare::{sequence_hash, sequences_value_equal};
use crate::error::Result;
use crate::interpret::Interpreter;
use crate::result::EvalResult;
use crate::sequence::Sequence;

impl Interpreter<'_> {
    /// Hash join of two tuple sequences.
    ///
    /// Children are the left and right sub-queries, each producing `tuple`
    /// elements with one member element per variable, followed by the key
    /// expression of each side. A key is evaluated with its variable bound
    /// to the content of the matching member. Matching pairs are merged
    /// into a new `tuple` in left-major order.
    pub(crate) fn join(
        &mut self,
        children: &[NodeId],
        vars: &JoinVars,
        input: &Sequence,
    ) -> Result<EvalResult> {
        let left = self.sequence(children[0], input)?;
        let right = self.sequence(children[1], input)?;

        let state = ahash::RandomState::new();
        let mut right_keys = Vec::with_capacity(right.len());
        let mut buckets: HashMap<u64, Vec<usize>> = HashMap::new();
        for (i, tuple) in right.iter().enumerate() {
            let key = self.tuple_key(tuple, &vars.right, children[3], input)?;
            if !key.is_empty() {
                buckets.entry(self.key_hash(&state, &key)).or_default().push(i);
            }
            right_keys.push(key);
        }

        let mut joined = Sequence::new();
        for left_tuple in left.iter() {
            let key = self.tuple_key(left_tuple, &vars.left, children[2], input)?;
            if key.is_empty() {
                continue;
            }
            let Some(bucket) = buckets.get(&self.key_hash(&state, &key)) else {
                continue;
            };
            for &i in bucket {
                if !sequences_value_equal(self.xot, &key, &right_keys[i]) {
                    continue;
                }
                if let Some(right_tuple) = right.get(i) {
                    joined.push(self.merge(left_tuple, right_tuple)?);
                }
            }
        }
        debug!(
            left = left.len(),
            right = right.len(),
            joined = joined.len(),
            "join on ${} = ${}",
            vars.left,
            vars.right
        );
        Ok(joined.into())
    }

    fn key_hash(&self, state: &ahash::RandomState, key: &Sequence) -> u64 {
        let mut hasher = state.build_hasher();
        sequence_hash(self.xot, key, &mut hasher);
        hasher.finish()
    }

    fn tuple_key(
        &mut self,
        tuple: xot::Node,
        var: &str,
        key: NodeId,
        input: &Sequence,
    ) -> Result<Sequence> {
        let value = self.member(tuple, var);
        self.with_scope(|this| {
            this.context_mut().push_var(var, value);
            this.sequence(key, input)
        })
    }

    // Original nodes behind the tuple member named `var`, falling back to
    // its element and text children.
    fn member(&self, tuple: xot::Node, var: &str) -> Sequence {
        let xot = &*self.xot;
        let Some(name) = xot.name(var) else {
            return Sequence::new();
        };
        xot.children(tuple)
            .find(|&child| xot.element(child).is_some_and(|e| e.name() == name))
            .map(|member| self.member_content(member))
            .unwrap_or_default()
    }

    fn member_content(&self, member: xot::Node) -> Sequence {
        if let Some(originals) = self.collector.member(member) {
            return originals.clone();
        }
        if let Some(content) = self.collector.content(member) {
            return content.clone();
        }
        let xot = &*self.xot;
        xot.children(member)
            .filter(|&c| xot.is_element(c) || xot.is_text(c))
            .collect()
    }

    fn merge(&mut self, left: xot::Node, right: xot::Node) -> Result<xot::Node> {
        let tuple = self.collector.element(self.xot, "tuple");
        for side in [left, right] {
            let members = self
                .xot
                .children(side)
                .filter(|&child| self.xot.is_element(child))
                .collect::<Vec<_>>();
            for member in members {
                let originals = self.member_content(member);
                for copy in self.collector.import(self.xot, tuple, member)? {
                    self.collector.set_member(copy, originals.clone());
                }
            }
        }
        Ok(tuple)
    }
}
