//! Transaction selection.
//!
//! The template's transaction array is already topologically ordered, but a
//! configured count cap can force a prefix. Selection must stay closed under
//! the in-template parent relation: a child whose parent was refused is
//! refused too. When the whole template fits under the cap, a cheaper
//! checker path validates and copies every transaction without dependency
//! analysis.

use std::collections::HashMap;
use std::io::Cursor;

use smelter_chains::{hashes::Txid, types::tx::Tx};
use smelter_core::ser::ByteFormat;

use crate::error::{WorkError, WorkResult};
use crate::template::TemplateTx;

/// A transaction admitted into the block being assembled.
#[derive(Clone, Debug)]
pub struct SelectedTx {
    /// The template payload, lowercase hex, emitted verbatim into the block.
    pub hex: String,
    /// Transaction ID, internal byte order.
    pub txid: Txid,
    /// Transaction ID as the template displayed it; the hash-sort rule
    /// orders by this string.
    pub txid_hex: String,
    /// Witness transaction ID display hex, when the template reported one.
    pub wtxid_hex: Option<String>,
    /// Fee in satoshis.
    pub fee: i64,
}

/// The selector's output: admitted transactions in block order, and the
/// block reward after fee accounting.
#[derive(Clone, Debug, Default)]
pub struct Selection {
    /// Admitted transactions.
    pub txs: Vec<SelectedTx>,
    /// `coinbasevalue` minus the fee of every admitted transaction.
    /// Transactions the cap drops are never re-credited; see DESIGN.md.
    pub block_reward: i64,
}

/// Select template transactions under `cap` (0 = unlimited), deducting each
/// admitted transaction's fee from `coinbase_value`.
pub fn select_transactions(
    transactions: &[TemplateTx],
    cap: usize,
    coinbase_value: i64,
    sort_txids: bool,
) -> WorkResult<Selection> {
    let cap = if cap == 0 { usize::MAX } else { cap };
    let mut selection = if transactions.len() <= cap {
        check_transactions(transactions, coinbase_value)?
    } else {
        resolve_transactions(transactions, cap, coinbase_value)
    };
    if sort_txids {
        selection.txs.sort_by(|a, b| a.txid_hex.cmp(&b.txid_hex));
    }
    Ok(selection)
}

/// The checker path: every transaction fits, so validate fields and copy in
/// template order. A transaction that fails to decode fails the whole load.
fn check_transactions(transactions: &[TemplateTx], coinbase_value: i64) -> WorkResult<Selection> {
    let mut selection = Selection {
        txs: Vec::with_capacity(transactions.len()),
        block_reward: coinbase_value,
    };
    for (index, tx) in transactions.iter().enumerate() {
        let (selected, _) = decode_entry(index, tx)?;
        selection.block_reward -= selected.fee;
        selection.txs.push(selected);
    }
    Ok(selection)
}

/// The dependency-resolving path. Walks the template in order, admitting
/// each transaction's unvisited in-template ancestors first; the first
/// refusal for cap exhaustion aborts the scan and every remaining
/// transaction is skipped.
fn resolve_transactions(transactions: &[TemplateTx], cap: usize, coinbase_value: i64) -> Selection {
    let mut entries: Vec<Option<SelectedTx>> = Vec::with_capacity(transactions.len());
    let mut parsed: Vec<Option<Tx>> = Vec::with_capacity(transactions.len());
    let mut index_of: HashMap<Txid, usize> = HashMap::with_capacity(transactions.len());

    for (index, tx) in transactions.iter().enumerate() {
        match decode_entry(index, tx) {
            Ok((selected, decoded)) => {
                index_of.insert(selected.txid, index);
                entries.push(Some(selected));
                parsed.push(Some(decoded));
            }
            Err(err) => {
                tracing::warn!(index, %err, "skipping undecodable template transaction");
                entries.push(None);
                parsed.push(None);
            }
        }
    }

    // dependsOn[i]: the first input of tx i that spends another template tx
    let mut depends_on: Vec<Option<usize>> = vec![None; entries.len()];
    for (i, decoded) in parsed.iter().enumerate() {
        if let Some(tx) = decoded {
            depends_on[i] = tx
                .vin
                .iter()
                .find_map(|input| index_of.get(&input.outpoint.txid).copied())
                .filter(|&j| j != i);
        }
    }

    let mut visited = vec![false; entries.len()];
    let mut selection = Selection {
        txs: vec![],
        block_reward: coinbase_value,
    };

    'outer: for i in 0..entries.len() {
        if visited[i] || entries[i].is_none() {
            continue;
        }

        // Climb the unvisited ancestor chain. An explicit stack bounds the
        // work even on pathological ancestor chains.
        let mut chain = vec![];
        let mut cursor = Some(i);
        while let Some(j) = cursor {
            if visited[j] || chain.len() >= entries.len() {
                break;
            }
            chain.push(j);
            cursor = depends_on[j];
        }

        // Admit ancestors before descendants.
        while let Some(j) = chain.pop() {
            if selection.txs.len() == cap {
                break 'outer;
            }
            if let Some(selected) = entries[j].take() {
                visited[j] = true;
                selection.block_reward -= selected.fee;
                selection.txs.push(selected);
            }
        }
    }

    selection
}

/// Decode one template transaction, requiring that the payload is consumed
/// exactly.
fn decode_entry(index: usize, tx: &TemplateTx) -> WorkResult<(SelectedTx, Tx)> {
    let raw = hex::decode(&tx.data).map_err(|e| WorkError::MalformedTransaction {
        index,
        reason: e.to_string(),
    })?;
    let total = raw.len();
    let mut cursor = Cursor::new(raw);
    let decoded = Tx::read_from(&mut cursor, 0).map_err(|e| WorkError::MalformedTransaction {
        index,
        reason: e.to_string(),
    })?;
    let consumed = cursor.position() as usize;
    if consumed != total {
        return Err(WorkError::MalformedTransaction {
            index,
            reason: format!("{} trailing bytes after transaction", total - consumed),
        });
    }
    let txid = Txid::from_be_hex(&tx.txid).map_err(|e| WorkError::MalformedTransaction {
        index,
        reason: format!("field `txid`: {e}"),
    })?;
    let selected = SelectedTx {
        hex: tx.data.to_ascii_lowercase(),
        txid,
        txid_hex: tx.txid.clone(),
        wtxid_hex: tx.hash.clone(),
        fee: tx.fee,
    };
    Ok((selected, decoded))
}

#[cfg(test)]
mod test {
    use super::*;
    use smelter_chains::types::{Outpoint, ScriptPubkey, TxIn, TxOut};

    /// A distinct, decodable transaction; `parent` wires its first input to
    /// another transaction's txid.
    fn make_tx(salt: u8, fee: i64, parent: Option<&TemplateTx>) -> TemplateTx {
        let outpoint = match parent {
            Some(p) => Outpoint::new(Txid::from_be_hex(&p.txid).unwrap(), 0),
            None => Outpoint::new(Txid::from([salt; 32]), 1),
        };
        let tx = Tx::new(
            2,
            vec![TxIn::new(outpoint, vec![salt], 0xffff_fffe)],
            vec![TxOut::new(50_000, ScriptPubkey::p2pkh(&[salt; 20]))],
            0,
        );
        TemplateTx {
            data: tx.serialize_hex().unwrap(),
            txid: tx.txid().to_be_hex(),
            hash: None,
            fee,
        }
    }

    #[test]
    fn it_admits_everything_under_the_cap_in_order() {
        let a = make_tx(1, 100, None);
        let b = make_tx(2, 200, Some(&a));
        let c = make_tx(3, 300, None);
        let template = vec![a.clone(), b.clone(), c.clone()];

        let selection = select_transactions(&template, 0, 1_000_000, false).unwrap();
        assert_eq!(selection.txs.len(), 3);
        assert_eq!(selection.block_reward, 1_000_000 - 600);
        let order: Vec<_> = selection.txs.iter().map(|t| t.txid_hex.clone()).collect();
        assert_eq!(order, vec![a.txid, b.txid, c.txid]);
    }

    #[test]
    fn the_cap_keeps_the_selection_ancestor_closed() {
        // [A, B(dep A), C, D(dep C)] with cap 2 admits exactly {A, B}
        let a = make_tx(1, 100, None);
        let b = make_tx(2, 200, Some(&a));
        let c = make_tx(3, 300, None);
        let d = make_tx(4, 400, Some(&c));
        let template = vec![a.clone(), b.clone(), c, d];

        let selection = select_transactions(&template, 2, 1_000_000, false).unwrap();
        let order: Vec<_> = selection.txs.iter().map(|t| t.txid_hex.clone()).collect();
        assert_eq!(order, vec![a.txid, b.txid]);
        // only admitted fees are deducted
        assert_eq!(selection.block_reward, 1_000_000 - 300);
    }

    #[test]
    fn children_pull_their_ancestors_forward() {
        // The child precedes its parent in template order; admitting it must
        // admit the parent first.
        let a = make_tx(1, 100, None);
        let b = make_tx(2, 200, Some(&a));
        let c = make_tx(3, 300, None);
        let template = vec![b.clone(), a.clone(), c];

        let selection = select_transactions(&template, 2, 1_000, false).unwrap();
        let order: Vec<_> = selection.txs.iter().map(|t| t.txid_hex.clone()).collect();
        assert_eq!(order, vec![a.txid, b.txid]);
        assert_eq!(selection.block_reward, 1_000 - 300);
    }

    #[test]
    fn it_sorts_by_hex_txid_on_request() {
        let txs: Vec<_> = (1..=4u8).map(|i| make_tx(i, 10, None)).collect();
        let mut expected: Vec<_> = txs.iter().map(|t| t.txid.clone()).collect();
        expected.sort();

        let selection = select_transactions(&txs, 0, 0, true).unwrap();
        let got: Vec<_> = selection.txs.iter().map(|t| t.txid_hex.clone()).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn the_checker_path_rejects_malformed_payloads() {
        let mut bad = make_tx(1, 0, None);
        bad.data.push_str("00"); // trailing byte
        match select_transactions(&[bad], 0, 0, false) {
            Err(WorkError::MalformedTransaction { index: 0, reason }) => {
                assert!(reason.contains("trailing"))
            }
            other => panic!("expected MalformedTransaction, got {:?}", other),
        }
    }

    #[test]
    fn the_resolver_path_skips_malformed_payloads() {
        let a = make_tx(1, 100, None);
        let mut bad = make_tx(2, 200, None);
        bad.data = "zz".into();
        let c = make_tx(3, 300, None);
        // cap below len() forces the resolver path
        let selection = select_transactions(&[a.clone(), bad, c.clone()], 2, 1_000, false).unwrap();
        let order: Vec<_> = selection.txs.iter().map(|t| t.txid_hex.clone()).collect();
        assert_eq!(order, vec![a.txid, c.txid]);
        assert_eq!(selection.block_reward, 1_000 - 400);
    }
}
