//! Graph convolutional autoencoder for link prediction.
//!
//! The pipeline holds out validation and test edges from an undirected
//! graph, encodes nodes with two graph convolutions over the normalized
//! training adjacency, decodes every node pair with an inner product and
//! scores held-out edges by ROC-AUC and average precision.
#![cfg_attr(docsrs, feature(doc_cfg))]

mod config;
mod dataset;
mod error;
mod evaluate;
mod layers;
mod model;
mod optimizer;
mod sparse;
mod split;
mod trainer;

#[cfg(test)]
mod property;
#[cfg(test)]
mod test_utils;

pub use crate::{
    config::{DEFAULT_SEED, TrainingConfig, TrainingConfigBuilder},
    dataset::{Dataset, GraphSource},
    error::{GcnError, GcnErrorCode, Result},
    evaluate::{LinkScores, average_precision_score, roc_auc_score, score},
    layers::{
        Activation, DecoderTrace, DenseConvTrace, GraphConvolution, GraphConvolutionSparse,
        InnerProductDecoder, LayerParameters, Phase, SparseConvTrace, dropout, dropout_mask,
        sigmoid,
    },
    model::{ForwardPass, GcnModel, Gradients, ModelDimensions},
    optimizer::{Adam, Optimizer, ReconstructionLoss},
    sparse::{SparseMatrix, SparseTriple, from_triple, sparse_dropout, symmetric_normalize, to_triple},
    split::{Edge, EdgeSplit, SplitCache, SplitConfig, load_split, save_split, split_edges},
    trainer::{EpochReport, Trainer, TrainingReport},
};
