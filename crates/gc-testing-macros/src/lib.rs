//! Proc-macro support for `gc-testing`.
//!
//! Provides `#[async_test]`, re-exported as `gc_testing::async_test`.

use quote::{quote, quote_spanned};
use syn::{parse::Parser, parse_macro_input, spanned::Spanned, Expr, ExprLit, Lit, Meta};

#[derive(Debug, Clone, Copy, Default)]
enum RuntimeFlavor {
    #[default]
    CurrentThread,
    MultiThread,
}

#[derive(Debug)]
enum RuntimeFlavorParseError {
    InvalidVariant(String),
}

impl std::fmt::Display for RuntimeFlavorParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidVariant(s) => {
                write!(
                    f,
                    "flavor must be \"current_thread\" or \"multi_thread\", got \"{s}\""
                )
            }
        }
    }
}

impl RuntimeFlavor {
    fn from_str(s: &str) -> Result<Self, RuntimeFlavorParseError> {
        match s {
            "current_thread" => Ok(Self::CurrentThread),
            "multi_thread" => Ok(Self::MultiThread),
            s => Err(RuntimeFlavorParseError::InvalidVariant(s.to_string())),
        }
    }
}

#[derive(Debug, Default)]
struct AsyncTestConfig {
    flavor: RuntimeFlavor,
    worker_threads: Option<u16>,
}

impl AsyncTestConfig {
    fn from_args(
        args: &syn::punctuated::Punctuated<Meta, syn::Token![,]>,
    ) -> Result<Self, syn::Error> {
        let mut config = Self::default();

        for arg in args {
            let Meta::NameValue(nv) = arg else {
                return Err(syn::Error::new_spanned(arg, "expected key = value"));
            };
            let ident = nv
                .path
                .get_ident()
                .ok_or_else(|| syn::Error::new_spanned(&nv.path, "expected ident"))?;

            match ident.to_string().as_str() {
                "flavor" => {
                    let Expr::Lit(ExprLit {
                        lit: Lit::Str(s), ..
                    }) = &nv.value
                    else {
                        return Err(syn::Error::new_spanned(
                            &nv.value,
                            "flavor must be a string literal",
                        ));
                    };
                    config.flavor = RuntimeFlavor::from_str(s.value().as_str())
                        .map_err(|e| syn::Error::new_spanned(s, e))?;
                }
                "worker_threads" => {
                    let Expr::Lit(ExprLit {
                        lit: Lit::Int(i), ..
                    }) = &nv.value
                    else {
                        return Err(syn::Error::new_spanned(
                            &nv.value,
                            "worker_threads must be an integer literal",
                        ));
                    };
                    let worker_threads: u16 = i.base10_parse()?;
                    if worker_threads == 0 {
                        return Err(syn::Error::new_spanned(
                            i,
                            "worker_threads must be greater than 0",
                        ));
                    }
                    config.worker_threads = Some(worker_threads);
                }
                _ => {
                    return Err(syn::Error::new_spanned(
                        ident,
                        format!("unknown attribute: {ident}"),
                    ))
                }
            }
        }

        if config.worker_threads.is_some() && matches!(config.flavor, RuntimeFlavor::CurrentThread)
        {
            return Err(syn::Error::new(
                proc_macro2::Span::call_site(),
                "worker_threads requires flavor = \"multi_thread\"",
            ));
        }

        Ok(config)
    }
}

/// Marks an `async fn` as a test run to completion on a fresh tokio runtime.
///
/// The runtime is current-thread unless `flavor = "multi_thread"` is given;
/// `worker_threads = N` sizes a multi-thread runtime.
///
/// ```ignore
/// #[gc_testing::async_test]
/// async fn entry_is_released() {
///     // ...
/// }
///
/// #[gc_testing::async_test(flavor = "multi_thread", worker_threads = 2)]
/// async fn entry_is_released_under_contention() {
///     // ...
/// }
/// ```
#[proc_macro_attribute]
pub fn async_test(
    args: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let input = parse_macro_input!(item as syn::ItemFn);

    let config = match syn::punctuated::Punctuated::<Meta, syn::Token![,]>::parse_terminated
        .parse(args)
        .and_then(|args| AsyncTestConfig::from_args(&args))
    {
        Ok(config) => config,
        Err(err) => return err.into_compile_error().into(),
    };

    if input.sig.asyncness.is_none() {
        return quote_spanned! {
            input.sig.fn_token.span =>
            compile_error!("the `async` keyword is missing from the function declaration");
        }
        .into();
    }

    if !input.sig.inputs.is_empty() {
        return quote_spanned! {
            input.sig.inputs.span() =>
            compile_error!("functions with #[async_test] cannot have arguments");
        }
        .into();
    }

    let attrs = &input.attrs;
    let body = &input.block;
    let ident = &input.sig.ident;
    let output = &input.sig.output;
    let vis = &input.vis;

    let runtime_setup = match config.flavor {
        RuntimeFlavor::MultiThread => {
            let worker_threads = config
                .worker_threads
                .map_or_else(|| quote! {}, |n| quote! { .worker_threads(#n as usize) });
            quote_spanned! {input.sig.span() =>
                ::gc_testing::__private::tokio::runtime::Builder::new_multi_thread()
                    .enable_all()
                    #worker_threads
            }
        }
        RuntimeFlavor::CurrentThread => {
            quote_spanned! {input.sig.span() =>
                ::gc_testing::__private::tokio::runtime::Builder::new_current_thread()
                    .enable_all()
            }
        }
    };

    let expanded = quote! {
        #[::core::prelude::v1::test]
        #(#attrs)*
        #vis fn #ident () #output {
            let rt = #runtime_setup
                .build()
                .expect("Failed building the Runtime");

            rt.block_on(async #body)
        }
    };

    expanded.into()
}
