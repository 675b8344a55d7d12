// Allow dead code for features exported but not yet used by the CLI
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{CommandFactory, Parser};

mod cli;
mod config;
mod conversion;
mod dataset;
mod error;
mod hub;

use crate::cli::{Args, Commands};
use crate::config::{ConfigTemplate, ConverterFunctions};
use crate::conversion::BatchOptions;

fn main() -> ExitCode {
    let args = Args::parse();

    // Honor NO_COLOR and plain-pipe output
    if std::env::var_os("NO_COLOR").is_some() || !atty::is(atty::Stream::Stdout) {
        console::set_colors_enabled(false);
    }

    let Some(command) = args.command else {
        // No subcommand prints help and exits successfully
        let _ = Args::command().print_help();
        return ExitCode::SUCCESS;
    };

    match run_command(&command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("✗ {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run_command(command: &Commands) -> anyhow::Result<bool> {
    match command {
        Commands::Download {
            dataset_id,
            output_dir,
            episodes,
            quiet,
        } => {
            let output_dir = output_dir
                .clone()
                .unwrap_or_else(|| Path::new("./data").join(dataset_id));
            run_download(dataset_id, &output_dir, episodes.as_deref(), *quiet)
        }
        Commands::Convert {
            input_dir,
            output_dir,
            episodes,
            config,
            converter_functions,
            strict: _,
            jobs,
            quiet,
        } => {
            let output_dir = output_dir.clone().unwrap_or_else(|| input_dir.join("mcap"));
            run_convert(
                input_dir,
                &output_dir,
                episodes.as_deref(),
                config.as_deref(),
                converter_functions.as_deref(),
                command.failure_policy(),
                *jobs,
                *quiet,
            )
        }
    }
}

fn run_download(
    dataset_id: &str,
    output_dir: &PathBuf,
    episodes: Option<&[u64]>,
    quiet: bool,
) -> anyhow::Result<bool> {
    if !quiet {
        println!(
            "{} {} -> {}",
            console::style("Downloading").bold(),
            dataset_id,
            output_dir.display()
        );
        if let Some(episodes) = episodes {
            println!("  episodes: {episodes:?}");
        }
    }

    let summary = hub::download_dataset(dataset_id, output_dir, episodes, quiet)?;
    if !quiet {
        println!(
            "✓ downloaded {} file(s) ({}) to {}",
            summary.files,
            conversion::batch::human_size(summary.bytes),
            output_dir.display()
        );
    }
    Ok(true)
}

#[allow(clippy::too_many_arguments)]
fn run_convert(
    input_dir: &Path,
    output_dir: &Path,
    episodes: Option<&[u64]>,
    config: Option<&Path>,
    converter_functions: Option<&Path>,
    policy: conversion::FailurePolicy,
    jobs: usize,
    quiet: bool,
) -> anyhow::Result<bool> {
    let template = match config {
        Some(path) => ConfigTemplate::from_path(path)?,
        None => ConfigTemplate::builtin_default(),
    };
    let functions = match converter_functions {
        Some(path) => ConverterFunctions::from_path(path)?,
        None => ConverterFunctions::builtin_default(),
    };

    let episodes = dataset::select(input_dir, episodes)
        .with_context(|| format!("failed to scan {}", input_dir.display()))?;
    if episodes.is_empty() {
        if !quiet {
            eprintln!("⚠ no episodes found in {}", input_dir.display());
        }
        return Ok(true);
    }

    if !quiet {
        println!(
            "{} {} episode(s) from {} -> {}",
            console::style("Converting").bold(),
            episodes.len(),
            input_dir.display(),
            output_dir.display()
        );
    }

    let options = BatchOptions { jobs, quiet };
    let outcome = conversion::convert_all(
        &episodes,
        input_dir,
        output_dir,
        &template,
        &functions,
        &options,
    )?;

    if !quiet {
        println!(
            "{} {} converted, {} failed, {} messages written at {}",
            console::style("Done:").green().bold(),
            outcome.succeeded,
            outcome.failed.len(),
            outcome.messages_written,
            outcome.finished_at.format("%H:%M:%S")
        );
    } else if !outcome.failed.is_empty() {
        eprintln!("✗ {} episode(s) failed to convert", outcome.failed.len());
    }

    Ok(outcome.is_success(policy))
}
